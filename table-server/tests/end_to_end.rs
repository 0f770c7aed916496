//! Full ordering flow through the live connection path:
//! admin + client sessions, order / cancel / kitchen status / bill / payment.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use futures::channel::mpsc as fmpsc;
use rust_decimal::Decimal;
use serde_json::Value;
use shared::models::{OrderSession, OrderSessionUpdate, ProductCreate, SessionStatus};
use table_server::hub::OutboundQueue;
use table_server::message::Role;
use table_server::session::{ConnectionSession, InboundFrame};
use table_server::{Config, HubStats, OrderStorage, ServerState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct Peer {
    inbound: fmpsc::UnboundedSender<Result<InboundFrame, Infallible>>,
    outbound: mpsc::Receiver<Arc<str>>,
    token: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl Peer {
    fn connect(state: &ServerState, role: Role) -> Self {
        let (queue, outbound) = OutboundQueue::new(32);
        let token = state.shutdown.child_token();
        let session = ConnectionSession::new(role, state.dispatcher.clone(), queue, token.clone());
        let (inbound, stream) = fmpsc::unbounded();
        let task = tokio::spawn(session.run(stream));
        Self {
            inbound,
            outbound,
            token,
            task,
        }
    }

    fn send(&self, text: String) {
        self.inbound.unbounded_send(Ok(InboundFrame::Text(text))).unwrap();
    }

    async fn recv(&mut self) -> Value {
        let frame = tokio::time::timeout(Duration::from_secs(2), self.outbound.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("outbound queue closed");
        serde_json::from_str(&frame).unwrap()
    }

    async fn assert_silent(&mut self) {
        let result = tokio::time::timeout(Duration::from_millis(100), self.outbound.recv()).await;
        assert!(result.is_err(), "unexpected frame: {:?}", result);
    }

    async fn close(self) {
        self.inbound.unbounded_send(Ok(InboundFrame::Close)).unwrap();
        self.task.await.unwrap();
        assert!(self.token.is_cancelled());
    }
}

fn state() -> ServerState {
    ServerState::with_repository(
        Config::default(),
        Arc::new(OrderStorage::open_in_memory().unwrap()),
    )
}

async fn wait_for(state: &ServerState, expected: HubStats) {
    for _ in 0..100 {
        if state.hub.stats().await == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("hub never reached {expected:?}");
}

fn open_session(state: &ServerState, table_number: i32) -> OrderSession {
    let session = state.coordinator.create_session(table_number).unwrap();
    state
        .coordinator
        .update_session(
            session.id,
            OrderSessionUpdate {
                table_number: None,
                status: Some(SessionStatus::Open),
            },
        )
        .unwrap()
}

fn order(product_id: Uuid) -> String {
    format!(r#"{{"type":"ORDER","data":{{"productId":"{product_id}"}}}}"#)
}

fn delete(id: &str) -> String {
    format!(r#"{{"type":"DELETE_ORDERED_PRODUCT","data":{{"orderedProductId":"{id}"}}}}"#)
}

fn set_status(id: &str, status: &str) -> String {
    format!(
        r#"{{"type":"UPDATE_ORDERED_PRODUCT_STATUS","data":{{"orderedProductId":"{id}","status":"{status}"}}}}"#
    )
}

#[tokio::test]
async fn test_table_ordering_flow() {
    let state = state();
    let category = state.coordinator.add_category("Pizza".to_string()).unwrap();
    let product = state
        .coordinator
        .add_product(ProductCreate {
            name: "Margherita".to_string(),
            description: "Tomato, mozzarella, basil".to_string(),
            category_id: category.id,
            price: Decimal::new(950, 2),
        })
        .unwrap();
    let session = open_session(&state, 4);

    let mut admin = Peer::connect(&state, Role::Admin);
    let mut client = Peer::connect(
        &state,
        Role::Client {
            session_id: session.id,
        },
    );
    wait_for(&state, HubStats { admins: 1, clients: 1 }).await;

    // Client orders: ack to the client, broadcast to staff
    client.send(order(product.id));
    let ack = client.recv().await;
    assert_eq!(ack["type"], "ORDER_OK");
    assert_eq!(ack["data"]["status"], "pending");
    assert_eq!(ack["data"]["productId"], product.id.to_string());
    let seen = admin.recv().await;
    assert_eq!(seen, ack);

    // Client cancels while still pending
    let item_id = ack["data"]["id"].as_str().unwrap().to_string();
    client.send(delete(&item_id));
    let ack = client.recv().await;
    assert_eq!(ack["type"], "DELETE_ORDERED_PRODUCT_OK");
    assert_eq!(admin.recv().await["type"], "DELETE_ORDERED_PRODUCT_OK");
    assert!(state.coordinator.list_ordered_products(session.id).unwrap().is_empty());

    // Two more, then the kitchen finishes both
    let mut ids = Vec::new();
    for _ in 0..2 {
        client.send(order(product.id));
        let ack = client.recv().await;
        assert_eq!(admin.recv().await["type"], "ORDER_OK");
        ids.push(ack["data"]["id"].as_str().unwrap().to_string());
    }
    for id in &ids {
        admin.send(set_status(id, "done"));
        let ack = admin.recv().await;
        assert_eq!(ack["type"], "UPDATE_ORDERED_PRODUCT_STATUS_OK");
        assert_eq!(ack["data"]["status"], "done");
        assert_eq!(client.recv().await, ack);
    }

    // A done item can no longer be cancelled by the guest; nobody else hears about it
    client.send(delete(&ids[0]));
    let err = client.recv().await;
    assert_eq!(err["type"], "ERROR");
    assert_eq!(err["data"]["code"], "ORDERED_PRODUCT_NOT_PENDING");
    admin.assert_silent().await;

    let bill = state.coordinator.get_bill(session.id).unwrap();
    assert_eq!(bill.items.len(), 1);
    assert_eq!(bill.items[0].quantity, 2);
    assert_eq!(bill.items[0].total_price, Decimal::new(1900, 2));
    assert_eq!(bill.total_price, Decimal::new(1900, 2));

    let paid = state.coordinator.pay_bill(session.id).unwrap();
    assert_eq!(paid.status, SessionStatus::Paid);
    assert!(state.coordinator.list_ordered_products(session.id).unwrap().is_empty());

    // Ordering after payment is refused
    client.send(order(product.id));
    assert_eq!(client.recv().await["data"]["code"], "SESSION_NOT_OPEN");

    client.close().await;
    admin.close().await;
    wait_for(&state, HubStats::default()).await;
}

#[tokio::test]
async fn test_broadcast_stays_within_table() {
    let state = state();
    let category = state.coordinator.add_category("Coffee".to_string()).unwrap();
    let product = state
        .coordinator
        .add_product(ProductCreate {
            name: "Espresso".to_string(),
            description: String::new(),
            category_id: category.id,
            price: Decimal::new(220, 2),
        })
        .unwrap();
    let table_1 = open_session(&state, 1);
    let table_2 = open_session(&state, 2);

    let mut guest_1 = Peer::connect(&state, Role::Client { session_id: table_1.id });
    let mut neighbour_1 = Peer::connect(&state, Role::Client { session_id: table_1.id });
    let mut guest_2 = Peer::connect(&state, Role::Client { session_id: table_2.id });
    wait_for(&state, HubStats { admins: 0, clients: 3 }).await;

    guest_1.send(order(product.id));
    let ack = guest_1.recv().await;
    assert_eq!(neighbour_1.recv().await, ack);
    guest_2.assert_silent().await;

    // Table 2 cannot cancel table 1's item
    let item_id = ack["data"]["id"].as_str().unwrap().to_string();
    guest_2.send(delete(&item_id));
    assert_eq!(
        guest_2.recv().await["data"]["code"],
        "ORDERED_PRODUCT_NOT_FOUND"
    );
    assert_eq!(
        state.coordinator.list_ordered_products(table_1.id).unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_shutdown_ends_connections() {
    let state = state();
    let session = open_session(&state, 7);
    let admin = Peer::connect(&state, Role::Admin);
    let client = Peer::connect(&state, Role::Client { session_id: session.id });
    wait_for(&state, HubStats { admins: 1, clients: 1 }).await;

    state.shutdown();
    admin.task.await.unwrap();
    client.task.await.unwrap();
    assert!(admin.token.is_cancelled());
    assert!(client.token.is_cancelled());
}
