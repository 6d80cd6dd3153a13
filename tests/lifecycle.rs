//! End-to-end lifecycle against the public surface only: broker frames are
//! serialized to bytes and fed through `handle_bytes`, client frames are
//! flushed into an in-memory transport and decoded back.

use coney::protocol::{basic, channel, connection, queue, AMQPClass};
use coney::types::FieldTable;
use coney::{
    gen_frame, AMQPContentHeader, AMQPFrame, BasicConsumeOptions, BasicProperties,
    BasicPublishOptions, Connection, Credentials, Delivery, FrameDecoder, MemoryTransport,
    QueueDeclareOptions, Queue,
};

use std::cell::RefCell;
use std::rc::Rc;

fn broker_sends(conn: &mut Connection, frame: AMQPFrame) {
    let mut bytes = Vec::new();
    gen_frame(&frame, &mut bytes).expect("encode broker frame");
    conn.handle_bytes(&bytes).expect("handle broker bytes");
}

fn client_frames(conn: &mut Connection) -> Vec<AMQPFrame> {
    let mut transport = MemoryTransport::default();
    conn.flush(&mut transport).expect("flush");
    let bytes = transport.drain();

    let mut frames = Vec::new();
    let mut decoder = FrameDecoder::new();
    // the protocol header is raw bytes, not a framed unit
    let bytes = match bytes.strip_prefix(b"AMQP\x00\x00\x09\x01".as_ref()) {
        Some(rest) => {
            frames.push(AMQPFrame::ProtocolHeader);
            rest
        }
        None => &bytes,
    };
    decoder.feed(bytes);
    while let Some(frame) = decoder.next_frame().expect("decode client frame") {
        frames.push(frame);
    }
    frames
}

fn handshake(conn: &mut Connection) {
    conn.connect().expect("connect");
    broker_sends(
        conn,
        AMQPFrame::Method(
            0,
            AMQPClass::Connection(connection::AMQPMethod::Start(connection::Start {
                version_major: 0,
                version_minor: 9,
                server_properties: FieldTable::new(),
                mechanisms: "PLAIN".to_string(),
                locales: "en_US".to_string(),
            })),
        ),
    );
    broker_sends(
        conn,
        AMQPFrame::Method(
            0,
            AMQPClass::Connection(connection::AMQPMethod::Tune(connection::Tune {
                channel_max: 2047,
                frame_max: 131072,
                heartbeat: 60,
            })),
        ),
    );
    broker_sends(
        conn,
        AMQPFrame::Method(
            0,
            AMQPClass::Connection(connection::AMQPMethod::OpenOk(connection::OpenOk {})),
        ),
    );
    assert!(conn.is_open());
}

#[test]
fn full_lifecycle_over_bytes() {
    let mut conn = Connection::default();
    conn.set_credentials(Credentials::new("guest".to_string(), "guest".to_string()));
    handshake(&mut conn);

    let frames = client_frames(&mut conn);
    assert!(matches!(frames[0], AMQPFrame::ProtocolHeader));
    assert!(frames.iter().any(|frame| matches!(
        frame,
        AMQPFrame::Method(0, AMQPClass::Connection(connection::AMQPMethod::StartOk(m)))
            if m.mechanism == "PLAIN" && m.response == "\u{0}guest\u{0}guest"
    )));

    // channel open
    let channel = conn.create_channel(1).expect("create channel");
    channel.open(|_, _| {}).expect("open channel");
    broker_sends(
        &mut conn,
        AMQPFrame::Method(
            1,
            AMQPClass::Channel(channel::AMQPMethod::OpenOk(channel::OpenOk {})),
        ),
    );
    assert!(conn.channel(1).expect("channel").status().is_opened());

    // declare a server-named queue
    let declared = Rc::new(RefCell::new(String::new()));
    {
        let declared = declared.clone();
        conn.channel_mut(1)
            .expect("channel")
            .queue_declare(
                Queue::new("", QueueDeclareOptions::default(), FieldTable::default()),
                move |queue, _| *declared.borrow_mut() = queue.name().to_string(),
            )
            .expect("declare");
    }
    broker_sends(
        &mut conn,
        AMQPFrame::Method(
            1,
            AMQPClass::Queue(queue::AMQPMethod::DeclareOk(queue::DeclareOk {
                queue: "amq.gen-tasks".to_string(),
                message_count: 0,
                consumer_count: 0,
            })),
        ),
    );
    assert_eq!(*declared.borrow(), "amq.gen-tasks");

    // subscribe and receive one chunked delivery
    let deliveries: Rc<RefCell<Vec<Delivery>>> = Rc::new(RefCell::new(Vec::new()));
    {
        let deliveries = deliveries.clone();
        conn.channel_mut(1)
            .expect("channel")
            .basic_consume(
                "amq.gen-tasks",
                "",
                BasicConsumeOptions::default(),
                FieldTable::default(),
                move |delivery: Delivery| deliveries.borrow_mut().push(delivery),
                |_, _| {},
            )
            .expect("consume");
    }
    broker_sends(
        &mut conn,
        AMQPFrame::Method(
            1,
            AMQPClass::Basic(basic::AMQPMethod::ConsumeOk(basic::ConsumeOk {
                consumer_tag: "amq.ctag-1".to_string(),
            })),
        ),
    );
    broker_sends(
        &mut conn,
        AMQPFrame::Method(
            1,
            AMQPClass::Basic(basic::AMQPMethod::Deliver(basic::Deliver {
                consumer_tag: "amq.ctag-1".to_string(),
                delivery_tag: 7,
                redelivered: false,
                exchange: "".to_string(),
                routing_key: "amq.gen-tasks".to_string(),
            })),
        ),
    );
    broker_sends(
        &mut conn,
        AMQPFrame::Header(
            1,
            Box::new(AMQPContentHeader {
                class_id: 60,
                weight: 0,
                body_size: 11,
                properties: BasicProperties::default(),
            }),
        ),
    );
    broker_sends(&mut conn, AMQPFrame::Body(1, b"hello ".to_vec()));
    broker_sends(&mut conn, AMQPFrame::Body(1, b"world".to_vec()));

    {
        let deliveries = deliveries.borrow();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].delivery_tag, 7);
        assert_eq!(deliveries[0].data, b"hello world");
    }

    // publish goes out as method + header + body
    conn.channel_mut(1)
        .expect("channel")
        .basic_publish(
            "",
            "amq.gen-tasks",
            BasicPublishOptions::default(),
            b"reply",
            BasicProperties::default().with_delivery_mode(2),
        )
        .expect("publish");
    let frames = client_frames(&mut conn);
    assert!(matches!(
        frames.as_slice(),
        [
            AMQPFrame::Method(1, AMQPClass::Basic(basic::AMQPMethod::Publish(_))),
            AMQPFrame::Header(1, _),
            AMQPFrame::Body(1, _)
        ]
    ));

    // goodbye
    let closed = Rc::new(RefCell::new(false));
    {
        let closed = closed.clone();
        conn.disconnect(move |_, _| *closed.borrow_mut() = true)
            .expect("disconnect");
    }
    broker_sends(
        &mut conn,
        AMQPFrame::Method(
            0,
            AMQPClass::Connection(connection::AMQPMethod::CloseOk(connection::CloseOk {})),
        ),
    );
    assert!(*closed.borrow());
    assert!(conn.status().closed());
    assert!(conn.channel(1).is_none());
}
