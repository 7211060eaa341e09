pub mod note;
pub mod signup;
pub mod token;
pub mod user;
