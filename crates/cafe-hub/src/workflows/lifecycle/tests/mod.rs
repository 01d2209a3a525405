mod common;
mod projections;
