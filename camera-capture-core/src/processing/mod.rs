pub mod square_crop;
