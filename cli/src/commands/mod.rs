mod helpers;
mod orders;
mod sync;

pub(crate) use orders::cmd_orders;
pub(crate) use sync::cmd_sync;
