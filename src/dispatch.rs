//! Routing of inbound method frames.
//!
//! One static table over (class-id, method-id), fixed at compile time:
//! connection-class methods are pinned to channel 0, everything else goes to
//! the channel the frame names. Routing only — behaviour lives in the `on_*`
//! handlers on [`Connection`] and [`Channel`].

use crate::connection::Connection;
use crate::error::Result;
use crate::protocol::{basic, channel, connection, exchange, queue, tx, AMQPClass};

pub(crate) fn dispatch_method(conn: &mut Connection, channel_id: u16, method: AMQPClass) -> Result<()> {
    let class_id = method.get_amqp_class_id();
    let method_id = method.get_amqp_method_id();

    let method = match method {
        AMQPClass::Connection(m) => {
            conn.assert_channel0(channel_id, class_id, method_id)?;
            return match m {
                connection::AMQPMethod::Start(m) => conn.on_connection_start(m),
                connection::AMQPMethod::Secure(m) => conn.on_connection_secure(m),
                connection::AMQPMethod::Tune(m) => conn.on_connection_tune(m),
                connection::AMQPMethod::OpenOk(m) => conn.on_connection_open_ok(m),
                connection::AMQPMethod::Close(m) => conn.on_connection_close(m),
                connection::AMQPMethod::CloseOk(m) => conn.on_connection_close_ok(m),
                connection::AMQPMethod::Blocked(m) => conn.on_connection_blocked(m),
                connection::AMQPMethod::Unblocked(m) => conn.on_connection_unblocked(m),
                connection::AMQPMethod::StartOk(_)
                | connection::AMQPMethod::SecureOk(_)
                | connection::AMQPMethod::TuneOk(_)
                | connection::AMQPMethod::Open(_) => {
                    conn.on_unimplemented(channel_id, class_id, method_id)
                }
            };
        }
        other => other,
    };

    // A channel mid-content-transfer must not see any method frame.
    {
        let channel = conn.expect_channel(channel_id)?;
        if !channel.content_is_idle() {
            channel.on_unexpected_frame(class_id, method_id);
            return Ok(());
        }
    }

    match method {
        AMQPClass::Channel(m) => match m {
            channel::AMQPMethod::OpenOk(m) => conn.expect_channel(channel_id)?.on_channel_open_ok(m),
            channel::AMQPMethod::Flow(m) => conn.expect_channel(channel_id)?.on_channel_flow(m),
            channel::AMQPMethod::FlowOk(m) => conn.expect_channel(channel_id)?.on_channel_flow_ok(m),
            channel::AMQPMethod::Close(m) => conn.on_channel_close(channel_id, m),
            channel::AMQPMethod::CloseOk(m) => conn.on_channel_close_ok(channel_id, m),
            channel::AMQPMethod::Open(_) => conn.on_unimplemented(channel_id, class_id, method_id),
        },
        AMQPClass::Exchange(m) => match m {
            exchange::AMQPMethod::DeclareOk(m) => {
                conn.expect_channel(channel_id)?.on_exchange_declare_ok(m)
            }
            exchange::AMQPMethod::DeleteOk(m) => {
                conn.expect_channel(channel_id)?.on_exchange_delete_ok(m)
            }
            exchange::AMQPMethod::Declare(_) | exchange::AMQPMethod::Delete(_) => {
                conn.on_unimplemented(channel_id, class_id, method_id)
            }
        },
        AMQPClass::Queue(m) => match m {
            queue::AMQPMethod::DeclareOk(m) => conn.expect_channel(channel_id)?.on_queue_declare_ok(m),
            queue::AMQPMethod::BindOk(m) => conn.expect_channel(channel_id)?.on_queue_bind_ok(m),
            queue::AMQPMethod::UnbindOk(m) => conn.expect_channel(channel_id)?.on_queue_unbind_ok(m),
            queue::AMQPMethod::PurgeOk(m) => conn.expect_channel(channel_id)?.on_queue_purge_ok(m),
            queue::AMQPMethod::DeleteOk(m) => conn.expect_channel(channel_id)?.on_queue_delete_ok(m),
            queue::AMQPMethod::Declare(_)
            | queue::AMQPMethod::Bind(_)
            | queue::AMQPMethod::Unbind(_)
            | queue::AMQPMethod::Purge(_)
            | queue::AMQPMethod::Delete(_) => conn.on_unimplemented(channel_id, class_id, method_id),
        },
        AMQPClass::Basic(m) => match m {
            basic::AMQPMethod::QosOk(m) => conn.expect_channel(channel_id)?.on_basic_qos_ok(m),
            basic::AMQPMethod::ConsumeOk(m) => conn.expect_channel(channel_id)?.on_basic_consume_ok(m),
            basic::AMQPMethod::CancelOk(m) => conn.expect_channel(channel_id)?.on_basic_cancel_ok(m),
            basic::AMQPMethod::Cancel(m) => conn.expect_channel(channel_id)?.on_basic_cancel(m),
            basic::AMQPMethod::Deliver(m) => conn.expect_channel(channel_id)?.on_basic_deliver(m),
            basic::AMQPMethod::GetOk(m) => conn.expect_channel(channel_id)?.on_basic_get_ok(m),
            basic::AMQPMethod::GetEmpty(m) => conn.expect_channel(channel_id)?.on_basic_get_empty(m),
            basic::AMQPMethod::Return(m) => conn.expect_channel(channel_id)?.on_basic_return(m),
            basic::AMQPMethod::RecoverOk(m) => conn.expect_channel(channel_id)?.on_basic_recover_ok(m),
            basic::AMQPMethod::Qos(_)
            | basic::AMQPMethod::Consume(_)
            | basic::AMQPMethod::Publish(_)
            | basic::AMQPMethod::Get(_)
            | basic::AMQPMethod::Ack(_)
            | basic::AMQPMethod::Reject(_)
            | basic::AMQPMethod::Recover(_)
            | basic::AMQPMethod::Nack(_) => conn.on_unimplemented(channel_id, class_id, method_id),
        },
        AMQPClass::Tx(m) => match m {
            tx::AMQPMethod::SelectOk(m) => conn.expect_channel(channel_id)?.on_tx_select_ok(m),
            tx::AMQPMethod::CommitOk(m) => conn.expect_channel(channel_id)?.on_tx_commit_ok(m),
            tx::AMQPMethod::RollbackOk(m) => conn.expect_channel(channel_id)?.on_tx_rollback_ok(m),
            tx::AMQPMethod::Select(_) | tx::AMQPMethod::Commit(_) | tx::AMQPMethod::Rollback(_) => {
                conn.on_unimplemented(channel_id, class_id, method_id)
            }
        },
        // connection class handled above
        AMQPClass::Connection(_) => Ok(()),
    }
}
