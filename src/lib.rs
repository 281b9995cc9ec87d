pub mod codec;
pub mod device;
pub mod net;
pub mod queue;
pub mod scenario;
pub mod sim;
pub mod trace;

#[cfg(test)]
mod test;
