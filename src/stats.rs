pub mod batch;
pub mod correlation;
pub mod descriptive;
pub mod effect;
pub mod fdr;
pub mod group;
pub mod reduction;
pub mod regression;
pub mod select;
