mod harness;

mod branches;
mod failures;
mod naming;
mod sequencing;
