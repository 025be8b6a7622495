pub mod rest;

pub use rest::SkinportClient;
