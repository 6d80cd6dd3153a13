//! The channel: one multiplexed protocol stream with its own lifecycle,
//! entities and reply correlation.
//!
//! Every request class the broker answers has its own FIFO of awaiting
//! entities. AMQP guarantees per-channel replies arrive in request order, so
//! the head of the matching FIFO is always the entity the reply belongs to;
//! entities are enqueued before their frame is handed to the transport.

use crate::callbacks::{self, Callbacks, Event};
use crate::channel_status::ChannelState;
use crate::configuration::Configuration;
use crate::consumer::{Consumer, ConsumerDelegate};
use crate::error::{Error, Result};
use crate::exchange::Exchange;
use crate::frame::{AMQPContentHeader, AMQPFrame};
use crate::message::{BasicGetMessage, BasicReturnMessage, Delivery};
use crate::options::*;
use crate::protocol::basic::AMQPProperties;
use crate::protocol::constants::{CLASS_BASIC, CLASS_EXCHANGE, CLASS_QUEUE};
use crate::protocol::{self, AMQPClass, AMQPError, AMQPHardError};
use crate::queue::Queue;
use crate::types::{FieldTable, LongLongUInt, ShortString, ShortUInt};

use flume::Sender;
use tracing::{error, trace, warn};

use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Continuation for a `basic.get`; receives `None` when the queue was empty.
pub type GetCallback = Box<dyn FnOnce(&mut Channel, Option<BasicGetMessage>)>;

type ReturnCallback = Box<dyn FnMut(&mut Channel, BasicReturnMessage)>;

struct PendingGet {
    queue: ShortString,
    on_get: GetCallback,
}

/// One FIFO per broker reply class, popped from the head as replies arrive.
#[derive(Default)]
pub(crate) struct AwaitingReplies {
    pub(crate) queue_declare_ok: VecDeque<Queue>,
    pub(crate) queue_bind_ok: VecDeque<ShortString>,
    pub(crate) queue_unbind_ok: VecDeque<ShortString>,
    pub(crate) queue_purge_ok: VecDeque<ShortString>,
    pub(crate) queue_delete_ok: VecDeque<ShortString>,
    pub(crate) consume_ok: VecDeque<Consumer>,
    pub(crate) cancel_ok: VecDeque<ShortString>,
    get_response: VecDeque<PendingGet>,
    pub(crate) exchange_declare_ok: VecDeque<Exchange>,
    pub(crate) exchange_delete_ok: VecDeque<ShortString>,
}

impl AwaitingReplies {
    fn reset(&mut self) {
        self.queue_declare_ok.clear();
        self.queue_bind_ok.clear();
        self.queue_unbind_ok.clear();
        self.queue_purge_ok.clear();
        self.queue_delete_ok.clear();
        self.consume_ok.clear();
        self.cancel_ok.clear();
        self.get_response.clear();
        self.exchange_declare_ok.clear();
        self.exchange_delete_ok.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue_declare_ok.is_empty()
            && self.queue_bind_ok.is_empty()
            && self.queue_unbind_ok.is_empty()
            && self.queue_purge_ok.is_empty()
            && self.queue_delete_ok.is_empty()
            && self.consume_ok.is_empty()
            && self.cancel_ok.is_empty()
            && self.get_response.is_empty()
            && self.exchange_declare_ok.is_empty()
            && self.exchange_delete_ok.is_empty()
    }
}

enum ContentTarget {
    Deliver {
        consumer_tag: ShortString,
        delivery: Delivery,
    },
    Get {
        message: BasicGetMessage,
        on_get: GetCallback,
    },
    Return {
        message: BasicReturnMessage,
    },
}

impl ContentTarget {
    fn set_properties(&mut self, properties: AMQPProperties) {
        match self {
            ContentTarget::Deliver { delivery, .. } => delivery.properties = properties,
            ContentTarget::Get { message, .. } => message.delivery.properties = properties,
            ContentTarget::Return { message } => message.delivery.properties = properties,
        }
    }

    fn receive_content(&mut self, data: Vec<u8>) {
        match self {
            ContentTarget::Deliver { delivery, .. } => delivery.receive_content(data),
            ContentTarget::Get { message, .. } => message.delivery.receive_content(data),
            ContentTarget::Return { message } => message.delivery.receive_content(data),
        }
    }
}

/// Inbound content assembly: a content-bearing method puts the channel into
/// `WillReceive`, the header sizes the body, body frames accumulate until
/// the count is met. At most one content is in flight per channel.
enum ContentState {
    Idle,
    WillReceive(ContentTarget),
    Receiving { target: ContentTarget, remaining: usize },
}

pub struct Channel {
    id: u16,
    configuration: Configuration,
    status: ChannelState,
    flow_active: bool,
    frame_sender: Sender<AMQPFrame>,
    pub(crate) callbacks: Callbacks<Channel>,
    queues: HashMap<ShortString, Queue>,
    exchanges: HashMap<ShortString, Exchange>,
    consumers: HashMap<ShortString, Consumer>,
    content: ContentState,
    on_return: Option<ReturnCallback>,
    pub(crate) awaiting: AwaitingReplies,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("flow_active", &self.flow_active)
            .field("queues", &self.queues.keys())
            .field("exchanges", &self.exchanges.keys())
            .field("consumers", &self.consumers.keys())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl Channel {
    pub(crate) fn new(id: u16, configuration: Configuration, frame_sender: Sender<AMQPFrame>) -> Channel {
        Channel {
            id,
            configuration,
            status: ChannelState::default(),
            flow_active: true,
            frame_sender,
            callbacks: Callbacks::default(),
            queues: HashMap::new(),
            exchanges: HashMap::new(),
            consumers: HashMap::new(),
            content: ContentState::Idle,
            on_return: None,
            awaiting: AwaitingReplies::default(),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn status(&self) -> ChannelState {
        self.status
    }

    pub fn flow_is_active(&self) -> bool {
        self.flow_active
    }

    pub fn queue(&self, name: &str) -> Option<&Queue> {
        self.queues.get(name)
    }

    pub fn queue_mut(&mut self, name: &str) -> Option<&mut Queue> {
        self.queues.get_mut(name)
    }

    pub fn exchange(&self, name: &str) -> Option<&Exchange> {
        self.exchanges.get(name)
    }

    pub fn consumer(&self, tag: &str) -> Option<&Consumer> {
        self.consumers.get(tag)
    }

    /// Registers a standing hook on this channel.
    pub fn on(&mut self, event: Event, callback: impl FnMut(&mut Channel, &AMQPClass) + 'static) {
        self.callbacks.on(event, callback);
    }

    /// Registers a hook dropped after its first firing.
    pub fn once(&mut self, event: Event, callback: impl FnOnce(&mut Channel, &AMQPClass) + 'static) {
        self.callbacks.once(event, callback);
    }

    /// Replaces every hook for `event` with this one.
    pub fn redefine(&mut self, event: Event, callback: impl FnMut(&mut Channel, &AMQPClass) + 'static) {
        self.callbacks.redefine(event, callback);
    }

    /// Receives mandatory publishes the broker could not route.
    pub fn set_on_return(&mut self, callback: impl FnMut(&mut Channel, BasicReturnMessage) + 'static) {
        self.on_return = Some(Box::new(callback));
    }

    pub(crate) fn exec_callbacks(&mut self, event: Event, payload: &AMQPClass) {
        callbacks::emit(self, |channel| &mut channel.callbacks, event, payload);
    }

    fn send_method(&mut self, method: AMQPClass) {
        trace!(
            "channel {} sending {}.{}",
            self.id,
            method.get_amqp_class_id(),
            method.get_amqp_method_id()
        );
        let _ = self.frame_sender.send(AMQPFrame::Method(self.id, method));
    }

    fn assert_opened(&self) -> Result<()> {
        if self.status.is_opened() {
            Ok(())
        } else {
            Err(Error::InvalidChannelState(self.status))
        }
    }

    // Channel-scoped operations. Every one of them returns as soon as the
    // frame is queued; completion comes through the registered callback.

    pub fn open(&mut self, callback: impl FnOnce(&mut Channel, &AMQPClass) + 'static) -> Result<()> {
        if self.status != ChannelState::Initial {
            return Err(Error::InvalidChannelState(self.status));
        }
        self.callbacks.once(Event::Open, callback);
        self.status = ChannelState::Opening;
        self.send_method(AMQPClass::Channel(protocol::channel::AMQPMethod::Open(
            protocol::channel::Open {},
        )));
        Ok(())
    }

    pub fn close(
        &mut self,
        reply_code: ShortUInt,
        reply_text: &str,
        class_id: ShortUInt,
        method_id: ShortUInt,
        callback: impl FnOnce(&mut Channel, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        self.callbacks.once(Event::Close, callback);
        self.status = ChannelState::Closing;
        self.send_method(AMQPClass::Channel(protocol::channel::AMQPMethod::Close(
            protocol::channel::Close {
                reply_code,
                reply_text: reply_text.to_string(),
                class_id,
                method_id,
            },
        )));
        Ok(())
    }

    pub fn flow(
        &mut self,
        active: bool,
        callback: impl FnOnce(&mut Channel, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        self.callbacks.once(Event::Flow, callback);
        self.send_method(AMQPClass::Channel(protocol::channel::AMQPMethod::Flow(
            protocol::channel::Flow { active },
        )));
        Ok(())
    }

    pub fn basic_qos(
        &mut self,
        options: BasicQosOptions,
        callback: impl FnOnce(&mut Channel, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        self.callbacks.once(Event::Qos, callback);
        self.send_method(AMQPClass::Basic(protocol::basic::AMQPMethod::Qos(protocol::basic::Qos {
            prefetch_size: options.prefetch_size,
            prefetch_count: options.prefetch_count,
            global: options.global,
        })));
        Ok(())
    }

    pub fn basic_recover(
        &mut self,
        options: BasicRecoverOptions,
        callback: impl FnOnce(&mut Channel, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        self.callbacks.once(Event::Recover, callback);
        self.send_method(AMQPClass::Basic(protocol::basic::AMQPMethod::Recover(
            protocol::basic::Recover { requeue: options.requeue },
        )));
        Ok(())
    }

    pub fn tx_select(&mut self, callback: impl FnOnce(&mut Channel, &AMQPClass) + 'static) -> Result<()> {
        self.assert_opened()?;
        self.callbacks.once(Event::TxSelect, callback);
        self.send_method(AMQPClass::Tx(protocol::tx::AMQPMethod::Select(protocol::tx::Select {})));
        Ok(())
    }

    pub fn tx_commit(&mut self, callback: impl FnOnce(&mut Channel, &AMQPClass) + 'static) -> Result<()> {
        self.assert_opened()?;
        self.callbacks.once(Event::TxCommit, callback);
        self.send_method(AMQPClass::Tx(protocol::tx::AMQPMethod::Commit(protocol::tx::Commit {})));
        Ok(())
    }

    pub fn tx_rollback(&mut self, callback: impl FnOnce(&mut Channel, &AMQPClass) + 'static) -> Result<()> {
        self.assert_opened()?;
        self.callbacks.once(Event::TxRollback, callback);
        self.send_method(AMQPClass::Tx(protocol::tx::AMQPMethod::Rollback(
            protocol::tx::Rollback {},
        )));
        Ok(())
    }

    pub fn basic_ack(&mut self, delivery_tag: LongLongUInt, options: BasicAckOptions) -> Result<()> {
        self.assert_opened()?;
        self.send_method(AMQPClass::Basic(protocol::basic::AMQPMethod::Ack(protocol::basic::Ack {
            delivery_tag,
            multiple: options.multiple,
        })));
        Ok(())
    }

    pub fn basic_reject(&mut self, delivery_tag: LongLongUInt, options: BasicRejectOptions) -> Result<()> {
        self.assert_opened()?;
        self.send_method(AMQPClass::Basic(protocol::basic::AMQPMethod::Reject(
            protocol::basic::Reject {
                delivery_tag,
                requeue: options.requeue,
            },
        )));
        Ok(())
    }

    pub fn basic_nack(&mut self, delivery_tag: LongLongUInt, options: BasicNackOptions) -> Result<()> {
        self.assert_opened()?;
        self.send_method(AMQPClass::Basic(protocol::basic::AMQPMethod::Nack(protocol::basic::Nack {
            delivery_tag,
            multiple: options.multiple,
            requeue: options.requeue,
        })));
        Ok(())
    }

    // Entity-delegated operations. The entity (or its name) is pushed onto
    // the matching awaiting FIFO before the frame goes out.

    pub fn queue_declare(
        &mut self,
        mut queue: Queue,
        callback: impl FnOnce(&mut Queue, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        queue.callbacks.once(Event::DeclareOk, callback);
        let method = AMQPClass::Queue(protocol::queue::AMQPMethod::Declare(protocol::queue::Declare {
            queue: queue.name().to_string(),
            passive: queue.options().passive,
            durable: queue.options().durable,
            exclusive: queue.options().exclusive,
            auto_delete: queue.options().auto_delete,
            nowait: queue.options().nowait,
            arguments: queue.arguments().clone(),
        }));
        self.awaiting.queue_declare_ok.push_back(queue);
        self.send_method(method);
        Ok(())
    }

    pub fn queue_bind(
        &mut self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        options: QueueBindOptions,
        arguments: FieldTable,
        callback: impl FnOnce(&mut Queue, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        self.queue_entry(queue).callbacks.once(Event::BindOk, callback);
        self.awaiting.queue_bind_ok.push_back(queue.to_string());
        self.send_method(AMQPClass::Queue(protocol::queue::AMQPMethod::Bind(protocol::queue::Bind {
            queue: queue.to_string(),
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            nowait: options.nowait,
            arguments,
        })));
        Ok(())
    }

    pub fn queue_unbind(
        &mut self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        arguments: FieldTable,
        callback: impl FnOnce(&mut Queue, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        self.queue_entry(queue).callbacks.once(Event::UnbindOk, callback);
        self.awaiting.queue_unbind_ok.push_back(queue.to_string());
        self.send_method(AMQPClass::Queue(protocol::queue::AMQPMethod::Unbind(
            protocol::queue::Unbind {
                queue: queue.to_string(),
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                arguments,
            },
        )));
        Ok(())
    }

    pub fn queue_purge(
        &mut self,
        queue: &str,
        options: QueuePurgeOptions,
        callback: impl FnOnce(&mut Queue, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        self.queue_entry(queue).callbacks.once(Event::PurgeOk, callback);
        self.awaiting.queue_purge_ok.push_back(queue.to_string());
        self.send_method(AMQPClass::Queue(protocol::queue::AMQPMethod::Purge(protocol::queue::Purge {
            queue: queue.to_string(),
            nowait: options.nowait,
        })));
        Ok(())
    }

    pub fn queue_delete(
        &mut self,
        queue: &str,
        options: QueueDeleteOptions,
        callback: impl FnOnce(&mut Queue, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        self.queue_entry(queue).callbacks.once(Event::DeleteOk, callback);
        self.awaiting.queue_delete_ok.push_back(queue.to_string());
        self.send_method(AMQPClass::Queue(protocol::queue::AMQPMethod::Delete(protocol::queue::Delete {
            queue: queue.to_string(),
            if_unused: options.if_unused,
            if_empty: options.if_empty,
            nowait: options.nowait,
        })));
        Ok(())
    }

    pub fn exchange_declare(
        &mut self,
        mut exchange: Exchange,
        callback: impl FnOnce(&mut Exchange, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        exchange.callbacks.once(Event::DeclareOk, callback);
        let method = AMQPClass::Exchange(protocol::exchange::AMQPMethod::Declare(
            protocol::exchange::Declare {
                exchange: exchange.name().to_string(),
                kind: exchange.kind().kind().to_string(),
                passive: exchange.options().passive,
                durable: exchange.options().durable,
                auto_delete: exchange.options().auto_delete,
                internal: exchange.options().internal,
                nowait: exchange.options().nowait,
                arguments: exchange.arguments().clone(),
            },
        ));
        self.awaiting.exchange_declare_ok.push_back(exchange);
        self.send_method(method);
        Ok(())
    }

    pub fn exchange_delete(
        &mut self,
        exchange: &str,
        options: ExchangeDeleteOptions,
        callback: impl FnOnce(&mut Exchange, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        self.exchange_entry(exchange).callbacks.once(Event::DeleteOk, callback);
        self.awaiting.exchange_delete_ok.push_back(exchange.to_string());
        self.send_method(AMQPClass::Exchange(protocol::exchange::AMQPMethod::Delete(
            protocol::exchange::Delete {
                exchange: exchange.to_string(),
                if_unused: options.if_unused,
                nowait: options.nowait,
            },
        )));
        Ok(())
    }

    pub fn basic_consume(
        &mut self,
        queue: &str,
        consumer_tag: &str,
        options: BasicConsumeOptions,
        arguments: FieldTable,
        delegate: impl ConsumerDelegate + 'static,
        callback: impl FnOnce(&mut Consumer, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        let mut consumer = Consumer::new(
            consumer_tag.to_string(),
            queue.to_string(),
            options,
            arguments.clone(),
            Box::new(delegate),
        );
        consumer.callbacks.once(Event::ConsumeOk, callback);
        self.awaiting.consume_ok.push_back(consumer);
        self.send_method(AMQPClass::Basic(protocol::basic::AMQPMethod::Consume(
            protocol::basic::Consume {
                queue: queue.to_string(),
                consumer_tag: consumer_tag.to_string(),
                no_local: options.no_local,
                no_ack: options.no_ack,
                exclusive: options.exclusive,
                nowait: options.nowait,
                arguments,
            },
        )));
        Ok(())
    }

    pub fn basic_cancel(
        &mut self,
        consumer_tag: &str,
        options: BasicCancelOptions,
        callback: impl FnOnce(&mut Consumer, &AMQPClass) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        match self.consumers.get_mut(consumer_tag) {
            Some(consumer) => consumer.callbacks.once(Event::CancelOk, callback),
            None => warn!("channel {} cancelling unknown consumer {}", self.id, consumer_tag),
        }
        self.awaiting.cancel_ok.push_back(consumer_tag.to_string());
        self.send_method(AMQPClass::Basic(protocol::basic::AMQPMethod::Cancel(
            protocol::basic::Cancel {
                consumer_tag: consumer_tag.to_string(),
                nowait: options.nowait,
            },
        )));
        Ok(())
    }

    pub fn basic_get(
        &mut self,
        queue: &str,
        options: BasicGetOptions,
        on_get: impl FnOnce(&mut Channel, Option<BasicGetMessage>) + 'static,
    ) -> Result<()> {
        self.assert_opened()?;
        self.awaiting.get_response.push_back(PendingGet {
            queue: queue.to_string(),
            on_get: Box::new(on_get),
        });
        self.send_method(AMQPClass::Basic(protocol::basic::AMQPMethod::Get(protocol::basic::Get {
            queue: queue.to_string(),
            no_ack: options.no_ack,
        })));
        Ok(())
    }

    pub fn basic_publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        options: BasicPublishOptions,
        payload: &[u8],
        properties: AMQPProperties,
    ) -> Result<()> {
        self.assert_opened()?;
        self.send_method(AMQPClass::Basic(protocol::basic::AMQPMethod::Publish(
            protocol::basic::Publish {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                mandatory: options.mandatory,
                immediate: options.immediate,
            },
        )));
        let header = AMQPContentHeader {
            class_id: CLASS_BASIC,
            weight: 0,
            body_size: payload.len() as u64,
            properties,
        };
        let _ = self.frame_sender.send(AMQPFrame::Header(self.id, Box::new(header)));

        // a content body frame has 8 bytes of overhead
        let frame_max = self.configuration.frame_max();
        let chunk_size = if frame_max == 0 {
            payload.len().max(1)
        } else {
            frame_max as usize - 8
        };
        for chunk in payload.chunks(chunk_size) {
            let _ = self.frame_sender.send(AMQPFrame::Body(self.id, chunk.to_vec()));
        }
        Ok(())
    }

    // Lookup helpers; operating on a name we never saw materializes a bare
    // entity so its callbacks have somewhere to live.

    fn queue_entry(&mut self, name: &str) -> &mut Queue {
        self.queues
            .entry(name.to_string())
            .or_insert_with(|| Queue::new(name, QueueDeclareOptions::default(), FieldTable::default()))
    }

    fn exchange_entry(&mut self, name: &str) -> &mut Exchange {
        self.exchanges.entry(name.to_string()).or_insert_with(|| {
            Exchange::new(
                name,
                Default::default(),
                ExchangeDeclareOptions::default(),
                FieldTable::default(),
            )
        })
    }

    // Broker reply handlers, reached through the method dispatcher.

    pub(crate) fn on_channel_open_ok(&mut self, method: protocol::channel::OpenOk) -> Result<()> {
        if self.status != ChannelState::Opening {
            return Err(Error::InvalidChannelState(self.status));
        }
        self.status = ChannelState::Opened;
        let payload = AMQPClass::Channel(protocol::channel::AMQPMethod::OpenOk(method));
        self.exec_callbacks(Event::Open, &payload);
        Ok(())
    }

    pub(crate) fn on_channel_flow(&mut self, method: protocol::channel::Flow) -> Result<()> {
        self.flow_active = method.active;
        self.send_method(AMQPClass::Channel(protocol::channel::AMQPMethod::FlowOk(
            protocol::channel::FlowOk { active: method.active },
        )));
        let payload = AMQPClass::Channel(protocol::channel::AMQPMethod::Flow(method));
        self.exec_callbacks(Event::Flow, &payload);
        Ok(())
    }

    pub(crate) fn on_channel_flow_ok(&mut self, method: protocol::channel::FlowOk) -> Result<()> {
        // The broker just confirmed pausing/resuming the flow we asked for.
        let payload = AMQPClass::Channel(protocol::channel::AMQPMethod::FlowOk(method));
        self.exec_callbacks(Event::Flow, &payload);
        Ok(())
    }

    /// Broker-initiated close: report the reason, acknowledge, reset.
    pub(crate) fn on_channel_close(&mut self, method: protocol::channel::Close) -> Result<()> {
        match AMQPError::from_id(method.reply_code, method.reply_text.clone()) {
            Some(err) => error!(
                "channel {} closed by {}:{} => {:?}",
                self.id, method.class_id, method.method_id, err
            ),
            None => error!("channel {} closed: {:?}", self.id, method),
        }
        self.status = ChannelState::Closed;
        let payload = AMQPClass::Channel(protocol::channel::AMQPMethod::Close(method));
        self.exec_callbacks(Event::Error, &payload);
        self.send_method(AMQPClass::Channel(protocol::channel::AMQPMethod::CloseOk(
            protocol::channel::CloseOk {},
        )));
        self.handle_connection_interruption();
        Ok(())
    }

    pub(crate) fn on_channel_close_ok(&mut self, method: protocol::channel::CloseOk) -> Result<()> {
        self.status = ChannelState::Closed;
        let payload = AMQPClass::Channel(protocol::channel::AMQPMethod::CloseOk(method));
        self.exec_callbacks(Event::Close, &payload);
        self.handle_connection_interruption();
        Ok(())
    }

    pub(crate) fn on_basic_qos_ok(&mut self, method: protocol::basic::QosOk) -> Result<()> {
        let payload = AMQPClass::Basic(protocol::basic::AMQPMethod::QosOk(method));
        self.exec_callbacks(Event::Qos, &payload);
        Ok(())
    }

    pub(crate) fn on_basic_recover_ok(&mut self, method: protocol::basic::RecoverOk) -> Result<()> {
        let payload = AMQPClass::Basic(protocol::basic::AMQPMethod::RecoverOk(method));
        self.exec_callbacks(Event::Recover, &payload);
        Ok(())
    }

    pub(crate) fn on_tx_select_ok(&mut self, method: protocol::tx::SelectOk) -> Result<()> {
        let payload = AMQPClass::Tx(protocol::tx::AMQPMethod::SelectOk(method));
        self.exec_callbacks(Event::TxSelect, &payload);
        Ok(())
    }

    pub(crate) fn on_tx_commit_ok(&mut self, method: protocol::tx::CommitOk) -> Result<()> {
        let payload = AMQPClass::Tx(protocol::tx::AMQPMethod::CommitOk(method));
        self.exec_callbacks(Event::TxCommit, &payload);
        Ok(())
    }

    pub(crate) fn on_tx_rollback_ok(&mut self, method: protocol::tx::RollbackOk) -> Result<()> {
        let payload = AMQPClass::Tx(protocol::tx::AMQPMethod::RollbackOk(method));
        self.exec_callbacks(Event::TxRollback, &payload);
        Ok(())
    }

    pub(crate) fn on_queue_declare_ok(&mut self, method: protocol::queue::DeclareOk) -> Result<()> {
        let mut queue = self.awaiting.queue_declare_ok.pop_front().ok_or(Error::UnexpectedReply {
            class_id: CLASS_QUEUE,
            method_id: protocol::constants::QUEUE_DECLARE_OK,
        })?;
        queue.name = method.queue.clone();
        queue.message_count = method.message_count;
        queue.consumer_count = method.consumer_count;
        trace!("channel {} declared queue {}", self.id, queue.name);
        let payload = AMQPClass::Queue(protocol::queue::AMQPMethod::DeclareOk(method));
        queue.exec_callbacks(Event::DeclareOk, &payload);
        self.queues.insert(queue.name.clone(), queue);
        Ok(())
    }

    pub(crate) fn on_queue_bind_ok(&mut self, method: protocol::queue::BindOk) -> Result<()> {
        let name = self.awaiting.queue_bind_ok.pop_front().ok_or(Error::UnexpectedReply {
            class_id: CLASS_QUEUE,
            method_id: protocol::constants::QUEUE_BIND_OK,
        })?;
        let payload = AMQPClass::Queue(protocol::queue::AMQPMethod::BindOk(method));
        match self.queues.get_mut(&name) {
            Some(queue) => queue.exec_callbacks(Event::BindOk, &payload),
            None => warn!("channel {} bind-ok for unknown queue {}", self.id, name),
        }
        Ok(())
    }

    pub(crate) fn on_queue_unbind_ok(&mut self, method: protocol::queue::UnbindOk) -> Result<()> {
        let name = self.awaiting.queue_unbind_ok.pop_front().ok_or(Error::UnexpectedReply {
            class_id: CLASS_QUEUE,
            method_id: protocol::constants::QUEUE_UNBIND_OK,
        })?;
        let payload = AMQPClass::Queue(protocol::queue::AMQPMethod::UnbindOk(method));
        match self.queues.get_mut(&name) {
            Some(queue) => queue.exec_callbacks(Event::UnbindOk, &payload),
            None => warn!("channel {} unbind-ok for unknown queue {}", self.id, name),
        }
        Ok(())
    }

    pub(crate) fn on_queue_purge_ok(&mut self, method: protocol::queue::PurgeOk) -> Result<()> {
        let name = self.awaiting.queue_purge_ok.pop_front().ok_or(Error::UnexpectedReply {
            class_id: CLASS_QUEUE,
            method_id: protocol::constants::QUEUE_PURGE_OK,
        })?;
        let payload = AMQPClass::Queue(protocol::queue::AMQPMethod::PurgeOk(method));
        match self.queues.get_mut(&name) {
            Some(queue) => queue.exec_callbacks(Event::PurgeOk, &payload),
            None => warn!("channel {} purge-ok for unknown queue {}", self.id, name),
        }
        Ok(())
    }

    pub(crate) fn on_queue_delete_ok(&mut self, method: protocol::queue::DeleteOk) -> Result<()> {
        let name = self.awaiting.queue_delete_ok.pop_front().ok_or(Error::UnexpectedReply {
            class_id: CLASS_QUEUE,
            method_id: protocol::constants::QUEUE_DELETE_OK,
        })?;
        let payload = AMQPClass::Queue(protocol::queue::AMQPMethod::DeleteOk(method));
        match self.queues.remove(&name) {
            Some(mut queue) => queue.exec_callbacks(Event::DeleteOk, &payload),
            None => warn!("channel {} delete-ok for unknown queue {}", self.id, name),
        }
        Ok(())
    }

    pub(crate) fn on_exchange_declare_ok(&mut self, method: protocol::exchange::DeclareOk) -> Result<()> {
        let mut exchange =
            self.awaiting.exchange_declare_ok.pop_front().ok_or(Error::UnexpectedReply {
                class_id: CLASS_EXCHANGE,
                method_id: protocol::constants::EXCHANGE_DECLARE_OK,
            })?;
        trace!("channel {} declared exchange {}", self.id, exchange.name());
        let payload = AMQPClass::Exchange(protocol::exchange::AMQPMethod::DeclareOk(method));
        exchange.exec_callbacks(Event::DeclareOk, &payload);
        self.exchanges.insert(exchange.name().to_string(), exchange);
        Ok(())
    }

    pub(crate) fn on_exchange_delete_ok(&mut self, method: protocol::exchange::DeleteOk) -> Result<()> {
        let name = self.awaiting.exchange_delete_ok.pop_front().ok_or(Error::UnexpectedReply {
            class_id: CLASS_EXCHANGE,
            method_id: protocol::constants::EXCHANGE_DELETE_OK,
        })?;
        let payload = AMQPClass::Exchange(protocol::exchange::AMQPMethod::DeleteOk(method));
        match self.exchanges.remove(&name) {
            Some(mut exchange) => exchange.exec_callbacks(Event::DeleteOk, &payload),
            None => warn!("channel {} delete-ok for unknown exchange {}", self.id, name),
        }
        Ok(())
    }

    pub(crate) fn on_basic_consume_ok(&mut self, method: protocol::basic::ConsumeOk) -> Result<()> {
        let mut consumer = self.awaiting.consume_ok.pop_front().ok_or(Error::UnexpectedReply {
            class_id: CLASS_BASIC,
            method_id: protocol::constants::BASIC_CONSUME_OK,
        })?;
        consumer.tag = method.consumer_tag.clone();
        trace!("channel {} consumer {} registered", self.id, consumer.tag);
        let payload = AMQPClass::Basic(protocol::basic::AMQPMethod::ConsumeOk(method));
        consumer.exec_callbacks(Event::ConsumeOk, &payload);
        self.consumers.insert(consumer.tag.clone(), consumer);
        Ok(())
    }

    pub(crate) fn on_basic_cancel_ok(&mut self, method: protocol::basic::CancelOk) -> Result<()> {
        self.awaiting.cancel_ok.pop_front().ok_or(Error::UnexpectedReply {
            class_id: CLASS_BASIC,
            method_id: protocol::constants::BASIC_CANCEL_OK,
        })?;
        let tag = method.consumer_tag.clone();
        let payload = AMQPClass::Basic(protocol::basic::AMQPMethod::CancelOk(method));
        match self.consumers.remove(&tag) {
            Some(mut consumer) => consumer.cancel(&payload, false),
            None => warn!("channel {} cancel-ok for unknown consumer {}", self.id, tag),
        }
        Ok(())
    }

    /// Broker-initiated cancel (queue deleted, node going away, ...).
    pub(crate) fn on_basic_cancel(&mut self, method: protocol::basic::Cancel) -> Result<()> {
        let tag = method.consumer_tag.clone();
        let nowait = method.nowait;
        let payload = AMQPClass::Basic(protocol::basic::AMQPMethod::Cancel(method));
        match self.consumers.remove(&tag) {
            Some(mut consumer) => consumer.cancel(&payload, true),
            None => warn!("channel {} broker cancelled unknown consumer {}", self.id, tag),
        }
        if !nowait {
            self.send_method(AMQPClass::Basic(protocol::basic::AMQPMethod::CancelOk(
                protocol::basic::CancelOk { consumer_tag: tag },
            )));
        }
        Ok(())
    }

    pub(crate) fn on_basic_deliver(&mut self, method: protocol::basic::Deliver) -> Result<()> {
        self.content = ContentState::WillReceive(ContentTarget::Deliver {
            consumer_tag: method.consumer_tag,
            delivery: Delivery::new(
                method.delivery_tag,
                method.exchange,
                method.routing_key,
                method.redelivered,
            ),
        });
        Ok(())
    }

    pub(crate) fn on_basic_get_ok(&mut self, method: protocol::basic::GetOk) -> Result<()> {
        let pending = self.awaiting.get_response.pop_front().ok_or(Error::UnexpectedReply {
            class_id: CLASS_BASIC,
            method_id: protocol::constants::BASIC_GET_OK,
        })?;
        trace!("channel {} get-ok from queue {}", self.id, pending.queue);
        self.content = ContentState::WillReceive(ContentTarget::Get {
            message: BasicGetMessage {
                delivery: Delivery::new(
                    method.delivery_tag,
                    method.exchange,
                    method.routing_key,
                    method.redelivered,
                ),
                message_count: method.message_count,
            },
            on_get: pending.on_get,
        });
        Ok(())
    }

    pub(crate) fn on_basic_get_empty(&mut self, _method: protocol::basic::GetEmpty) -> Result<()> {
        let pending = self.awaiting.get_response.pop_front().ok_or(Error::UnexpectedReply {
            class_id: CLASS_BASIC,
            method_id: protocol::constants::BASIC_GET_EMPTY,
        })?;
        (pending.on_get)(self, None);
        Ok(())
    }

    pub(crate) fn on_basic_return(&mut self, method: protocol::basic::Return) -> Result<()> {
        self.content = ContentState::WillReceive(ContentTarget::Return {
            message: BasicReturnMessage {
                delivery: Delivery::new(0, method.exchange, method.routing_key, false),
                reply_code: method.reply_code,
                reply_text: method.reply_text,
            },
        });
        Ok(())
    }

    // Content assembly.

    pub(crate) fn handle_content_header_frame(&mut self, header: AMQPContentHeader) -> Result<()> {
        match std::mem::replace(&mut self.content, ContentState::Idle) {
            ContentState::WillReceive(mut target) => {
                target.set_properties(header.properties);
                if header.body_size == 0 {
                    self.complete_content(target);
                } else {
                    self.content = ContentState::Receiving {
                        target,
                        remaining: header.body_size as usize,
                    };
                }
                Ok(())
            }
            other => {
                self.content = other;
                Err(Error::UnexpectedContentFrame(self.id))
            }
        }
    }

    pub(crate) fn handle_body_frame(&mut self, payload: Vec<u8>) -> Result<()> {
        let payload_size = payload.len();
        match std::mem::replace(&mut self.content, ContentState::Idle) {
            ContentState::Receiving { mut target, remaining } if remaining >= payload_size => {
                target.receive_content(payload);
                if remaining == payload_size {
                    self.complete_content(target);
                } else {
                    self.content = ContentState::Receiving {
                        target,
                        remaining: remaining - payload_size,
                    };
                }
                Ok(())
            }
            other => {
                self.content = other;
                error!("channel {} received a body frame it cannot place", self.id);
                Err(Error::UnexpectedContentFrame(self.id))
            }
        }
    }

    fn complete_content(&mut self, target: ContentTarget) {
        match target {
            ContentTarget::Deliver { consumer_tag, delivery } => {
                match self.consumers.get_mut(&consumer_tag) {
                    Some(consumer) => consumer.new_delivery(delivery),
                    None => warn!(
                        "channel {} dropping delivery for unknown consumer {}",
                        self.id, consumer_tag
                    ),
                }
            }
            ContentTarget::Get { message, on_get } => on_get(self, Some(message)),
            ContentTarget::Return { message } => match self.on_return.take() {
                Some(mut callback) => {
                    callback(self, message);
                    if self.on_return.is_none() {
                        self.on_return = Some(callback);
                    }
                }
                None => warn!(
                    "channel {} returned message ({} {}) has no handler",
                    self.id, message.reply_code, message.reply_text
                ),
            },
        }
    }

    pub(crate) fn content_is_idle(&self) -> bool {
        matches!(self.content, ContentState::Idle)
    }

    /// A method frame barged into an unfinished content transfer: close the
    /// channel with 505 and drop the half-assembled message.
    pub(crate) fn on_unexpected_frame(&mut self, class_id: ShortUInt, method_id: ShortUInt) {
        let err = AMQPError::new(
            AMQPHardError::UNEXPECTEDFRAME.into(),
            "method received during content transfer".to_string(),
        );
        error!("channel {}: {} from {}.{}", self.id, err, class_id, method_id);
        self.content = ContentState::Idle;
        self.status = ChannelState::Closing;
        self.send_method(AMQPClass::Channel(protocol::channel::AMQPMethod::Close(
            protocol::channel::Close {
                reply_code: err.get_id(),
                reply_text: err.get_message().clone(),
                class_id,
                method_id,
            },
        )));
    }

    /// Resets per-connection state: flow reopens, every awaiting FIFO is
    /// dropped on the floor and the callback registry is emptied. Safe to
    /// call any number of times.
    pub(crate) fn handle_connection_interruption(&mut self) {
        trace!("channel {} resetting state", self.id);
        self.flow_active = true;
        self.awaiting.reset();
        self.callbacks.clear();
        self.content = ContentState::Idle;
        for consumer in self.consumers.values_mut() {
            consumer.interrupt();
        }
        self.consumers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{basic, channel as channel_methods, queue as queue_methods};

    use std::cell::RefCell;
    use std::rc::Rc;

    fn opened_channel() -> (Channel, flume::Receiver<AMQPFrame>) {
        let (tx, rx) = flume::unbounded();
        let mut channel = Channel::new(1, Configuration::default(), tx);
        channel.status = ChannelState::Opened;
        (channel, rx)
    }

    fn drain(rx: &flume::Receiver<AMQPFrame>) -> Vec<AMQPFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn declare_replies_pop_in_push_order() {
        let (mut channel, _rx) = opened_channel();
        let names = Rc::new(RefCell::new(Vec::new()));

        for _ in 0..2 {
            let names = names.clone();
            channel
                .queue_declare(
                    Queue::new("", QueueDeclareOptions::default(), FieldTable::default()),
                    move |queue, _| names.borrow_mut().push(queue.name().to_string()),
                )
                .unwrap();
        }
        assert_eq!(channel.awaiting.queue_declare_ok.len(), 2);

        for name in ["amq.gen-1", "amq.gen-2"].iter() {
            channel
                .on_queue_declare_ok(queue_methods::DeclareOk {
                    queue: name.to_string(),
                    message_count: 0,
                    consumer_count: 0,
                })
                .unwrap();
        }

        assert_eq!(*names.borrow(), vec!["amq.gen-1", "amq.gen-2"]);
        assert!(channel.queue("amq.gen-1").is_some());
        assert!(channel.queue("amq.gen-2").is_some());
    }

    #[test]
    fn unexpected_declare_ok_is_an_error() {
        let (mut channel, _rx) = opened_channel();
        let result = channel.on_queue_declare_ok(queue_methods::DeclareOk {
            queue: "q".to_string(),
            message_count: 0,
            consumer_count: 0,
        });
        assert!(matches!(result, Err(Error::UnexpectedReply { .. })));
    }

    #[test]
    fn interruption_resets_everything_and_is_idempotent() {
        let (mut channel, _rx) = opened_channel();
        channel.flow_active = false;
        channel.on(Event::Error, |_, _| {});
        channel
            .queue_declare(
                Queue::new("q", QueueDeclareOptions::default(), FieldTable::default()),
                |_, _| {},
            )
            .unwrap();
        channel.basic_get("q", BasicGetOptions::default(), |_, _| {}).unwrap();

        channel.handle_connection_interruption();
        assert!(channel.flow_is_active());
        assert!(channel.awaiting.is_empty());
        assert!(channel.callbacks.is_empty());

        channel.handle_connection_interruption();
        assert!(channel.flow_is_active());
        assert!(channel.awaiting.is_empty());
        assert!(channel.callbacks.is_empty());
    }

    #[test]
    fn content_reassembly_feeds_the_consumer() {
        let (mut channel, _rx) = opened_channel();
        let deliveries: Rc<RefCell<Vec<Delivery>>> = Rc::new(RefCell::new(Vec::new()));

        channel
            .basic_consume(
                "tasks",
                "ct",
                BasicConsumeOptions::default(),
                FieldTable::default(),
                {
                    let deliveries = deliveries.clone();
                    move |delivery: Delivery| deliveries.borrow_mut().push(delivery)
                },
                |_, _| {},
            )
            .unwrap();
        channel
            .on_basic_consume_ok(basic::ConsumeOk { consumer_tag: "ct".to_string() })
            .unwrap();

        channel
            .on_basic_deliver(basic::Deliver {
                consumer_tag: "ct".to_string(),
                delivery_tag: 7,
                redelivered: false,
                exchange: "e".to_string(),
                routing_key: "rk".to_string(),
            })
            .unwrap();
        channel
            .handle_content_header_frame(AMQPContentHeader {
                class_id: CLASS_BASIC,
                weight: 0,
                body_size: 11,
                properties: AMQPProperties::default(),
            })
            .unwrap();
        channel.handle_body_frame(b"hello ".to_vec()).unwrap();
        channel.handle_body_frame(b"world".to_vec()).unwrap();

        let deliveries = deliveries.borrow();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].delivery_tag, 7);
        assert_eq!(deliveries[0].exchange, "e");
        assert_eq!(deliveries[0].routing_key, "rk");
        assert_eq!(deliveries[0].data, b"hello world");
        assert!(channel.content_is_idle());
    }

    #[test]
    fn zero_length_content_completes_on_header() {
        let (mut channel, _rx) = opened_channel();
        let hits = Rc::new(RefCell::new(0));

        {
            let hits = hits.clone();
            channel
                .basic_consume(
                    "tasks",
                    "ct",
                    BasicConsumeOptions::default(),
                    FieldTable::default(),
                    move |_delivery: Delivery| *hits.borrow_mut() += 1,
                    |_, _| {},
                )
                .unwrap();
        }
        channel
            .on_basic_consume_ok(basic::ConsumeOk { consumer_tag: "ct".to_string() })
            .unwrap();

        channel
            .on_basic_deliver(basic::Deliver {
                consumer_tag: "ct".to_string(),
                delivery_tag: 1,
                redelivered: false,
                exchange: "".to_string(),
                routing_key: "tasks".to_string(),
            })
            .unwrap();
        channel
            .handle_content_header_frame(AMQPContentHeader {
                class_id: CLASS_BASIC,
                weight: 0,
                body_size: 0,
                properties: AMQPProperties::default(),
            })
            .unwrap();

        assert_eq!(*hits.borrow(), 1);
        assert!(channel.content_is_idle());
    }

    #[test]
    fn stray_content_frames_are_rejected() {
        let (mut channel, _rx) = opened_channel();
        assert!(matches!(
            channel.handle_body_frame(b"oops".to_vec()),
            Err(Error::UnexpectedContentFrame(1))
        ));
        assert!(matches!(
            channel.handle_content_header_frame(AMQPContentHeader::default()),
            Err(Error::UnexpectedContentFrame(1))
        ));
    }

    #[test]
    fn oversized_body_frame_is_rejected() {
        let (mut channel, _rx) = opened_channel();
        channel
            .on_basic_deliver(basic::Deliver {
                consumer_tag: "ct".to_string(),
                delivery_tag: 1,
                redelivered: false,
                exchange: "".to_string(),
                routing_key: "q".to_string(),
            })
            .unwrap();
        channel
            .handle_content_header_frame(AMQPContentHeader {
                class_id: CLASS_BASIC,
                weight: 0,
                body_size: 3,
                properties: AMQPProperties::default(),
            })
            .unwrap();
        assert!(matches!(
            channel.handle_body_frame(b"toolong".to_vec()),
            Err(Error::UnexpectedContentFrame(1))
        ));
    }

    #[test]
    fn method_during_content_closes_the_channel() {
        let (mut channel, rx) = opened_channel();
        channel
            .on_basic_deliver(basic::Deliver {
                consumer_tag: "ct".to_string(),
                delivery_tag: 1,
                redelivered: false,
                exchange: "".to_string(),
                routing_key: "q".to_string(),
            })
            .unwrap();
        assert!(!channel.content_is_idle());

        channel.on_unexpected_frame(CLASS_BASIC, protocol::constants::BASIC_DELIVER);
        assert_eq!(channel.status(), ChannelState::Closing);
        assert!(channel.content_is_idle());

        let frames = drain(&rx);
        match frames.last() {
            Some(AMQPFrame::Method(1, AMQPClass::Channel(channel_methods::AMQPMethod::Close(m)))) => {
                assert_eq!(m.reply_code, 505);
            }
            other => panic!("expected channel.close, got {:?}", other),
        }
    }

    #[test]
    fn publish_chunks_body_at_frame_max() {
        let (mut channel, rx) = opened_channel();
        channel.configuration.set_frame_max(16);

        channel
            .basic_publish(
                "",
                "tasks",
                BasicPublishOptions::default(),
                &[0u8; 20],
                AMQPProperties::default(),
            )
            .unwrap();

        let frames = drain(&rx);
        assert_eq!(frames.len(), 5);
        match &frames[1] {
            AMQPFrame::Header(1, header) => assert_eq!(header.body_size, 20),
            other => panic!("expected header frame, got {:?}", other),
        }
        // 20 bytes in chunks of frame_max - 8 = 8
        let body_sizes: Vec<usize> = frames[2..]
            .iter()
            .map(|frame| match frame {
                AMQPFrame::Body(1, payload) => payload.len(),
                other => panic!("expected body frame, got {:?}", other),
            })
            .collect();
        assert_eq!(body_sizes, vec![8, 8, 4]);
    }

    #[test]
    fn get_empty_resolves_with_none() {
        let (mut channel, _rx) = opened_channel();
        let results = Rc::new(RefCell::new(Vec::new()));
        {
            let results = results.clone();
            channel
                .basic_get("tasks", BasicGetOptions::default(), move |_, message| {
                    results.borrow_mut().push(message.is_some());
                })
                .unwrap();
        }
        channel.on_basic_get_empty(basic::GetEmpty {}).unwrap();
        assert_eq!(*results.borrow(), vec![false]);
    }

    #[test]
    fn operations_require_an_opened_channel() {
        let (tx, _rx) = flume::unbounded();
        let mut channel = Channel::new(1, Configuration::default(), tx);
        assert!(matches!(
            channel.tx_select(|_, _| {}),
            Err(Error::InvalidChannelState(ChannelState::Initial))
        ));
        assert!(matches!(
            channel.basic_ack(1, BasicAckOptions::default()),
            Err(Error::InvalidChannelState(ChannelState::Initial))
        ));
    }
}
