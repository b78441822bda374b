mod classifier;
mod common;
mod proximity;
mod report;
