pub mod normalize;
pub mod token;
