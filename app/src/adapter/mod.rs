mod webasto;

pub use webasto::CloudConfig;
