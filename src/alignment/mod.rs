pub mod normalization;
pub mod precise;
pub mod scoring;
pub mod speed;
pub mod tokenization;
