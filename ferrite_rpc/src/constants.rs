pub const MAGIC: u32 = 0x4645_5252;
pub const VERSION: u32 = 1;
pub const CHANNEL_CAPACITY: usize = 2_048;

pub const DEFAULT_HOST: &str = "localhost:8334";
pub const DEFAULT_USER: &str = "rpcuser";
pub const DEFAULT_SECRET: &str = "rpcpass";
