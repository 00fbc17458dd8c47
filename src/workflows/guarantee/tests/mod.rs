mod common;
mod policy;
mod siblings;
