pub mod digitalocean;

pub use digitalocean::DigitalOcean;
