use crate::types::{LongUInt, ShortUInt};

use parking_lot::Mutex;

use std::fmt;
use std::sync::Arc;

/// Fallback bound for channel ids while the connection has not negotiated
/// one (the broker reporting 0 means the same thing). Every `u16` id fits
/// under it.
pub const DEFAULT_CHANNEL_MAX: u32 = 65536;

/// The limits negotiated during the opening handshake.
///
/// A cloneable handle: the connection updates it when `connection.tune`
/// arrives and every channel reads it when chunking content or validating
/// ids.
#[derive(Clone, Default)]
pub struct Configuration {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    channel_max: ShortUInt,
    frame_max: LongUInt,
    heartbeat: ShortUInt,
}

impl Configuration {
    pub fn channel_max(&self) -> ShortUInt {
        self.inner.lock().channel_max
    }

    pub fn set_channel_max(&self, channel_max: ShortUInt) {
        self.inner.lock().channel_max = channel_max;
    }

    pub fn frame_max(&self) -> LongUInt {
        self.inner.lock().frame_max
    }

    pub fn set_frame_max(&self, frame_max: LongUInt) {
        self.inner.lock().frame_max = frame_max;
    }

    pub fn heartbeat(&self) -> ShortUInt {
        self.inner.lock().heartbeat
    }

    pub fn set_heartbeat(&self, heartbeat: ShortUInt) {
        self.inner.lock().heartbeat = heartbeat;
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Configuration")
            .field("channel_max", &inner.channel_max)
            .field("frame_max", &inner.frame_max)
            .field("heartbeat", &inner.heartbeat)
            .finish()
    }
}
