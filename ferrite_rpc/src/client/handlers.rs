use ferrite_messages::hash::BlockHash;

pub type BlockHandler = Box<dyn Fn(&BlockHash, u32) + Send + Sync>;

/// Caller supplied callbacks, one per event class. Only override the
/// handlers for notifications you care about; an event whose handler is
/// `None` is silently dropped. Handlers run on the client's notification
/// worker, never on the caller's task.
#[derive(Default)]
pub struct NotificationHandlers {
    pub on_block_connected: Option<BlockHandler>,
    pub on_block_disconnected: Option<BlockHandler>,
}

impl std::fmt::Debug for NotificationHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("NotificationHandlers")
            .field("on_block_connected", &self.on_block_connected.is_some())
            .field("on_block_disconnected", &self.on_block_disconnected.is_some())
            .finish()
    }
}
