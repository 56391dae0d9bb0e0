mod common;
mod leases;
