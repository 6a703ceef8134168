mod common;
mod lowering_tests;
mod normalize_tests;
