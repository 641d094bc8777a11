#![cfg(test)]

mod routing;
mod sweep;
mod util;
