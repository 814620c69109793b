use async_trait::async_trait;

/// Audio cues played around a take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    TickStart,
    TickIncrement,
    TickFinal,
    Shutter,
    RecordStart,
    RecordEnd,
}

/// Plays sound feedback.
#[async_trait]
pub trait CuePlayer: Send + Sync {
    /// Play `cue`, resolving when it has finished.
    async fn play(&self, cue: Cue);
}
