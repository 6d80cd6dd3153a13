//! Per-operation option structs. The packed wire bits are assembled at
//! encode time; these stay plain bools.

use crate::types::{LongUInt, ShortUInt};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExchangeDeclareOptions {
    pub passive: bool,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub nowait: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExchangeDeleteOptions {
    pub if_unused: bool,
    pub nowait: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueDeclareOptions {
    pub passive: bool,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
    pub nowait: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueBindOptions {
    pub nowait: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueuePurgeOptions {
    pub nowait: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueDeleteOptions {
    pub if_unused: bool,
    pub if_empty: bool,
    pub nowait: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasicConsumeOptions {
    pub no_local: bool,
    pub no_ack: bool,
    pub exclusive: bool,
    pub nowait: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasicCancelOptions {
    pub nowait: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasicPublishOptions {
    pub mandatory: bool,
    pub immediate: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasicGetOptions {
    pub no_ack: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasicAckOptions {
    pub multiple: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasicRejectOptions {
    pub requeue: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasicNackOptions {
    pub multiple: bool,
    pub requeue: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasicRecoverOptions {
    pub requeue: bool,
}

/// Prefetch window asked of the broker. The default is a 32-message window,
/// shared with nobody.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BasicQosOptions {
    pub prefetch_size: LongUInt,
    pub prefetch_count: ShortUInt,
    pub global: bool,
}

impl Default for BasicQosOptions {
    fn default() -> Self {
        Self {
            prefetch_size: 0,
            prefetch_count: 32,
            global: false,
        }
    }
}
