// Live queue index: position lookups, durable fallback, rebuild

mod common;

use common::harness;
use waitline_core::domain::Ticket;
use waitline_core::port::TicketRepository;

#[tokio::test]
async fn warm_index_reports_positions_in_seq_order() {
    let h = harness().await;
    let queue = h
        .service
        .create_queue("Library", "Main desk", None)
        .await
        .unwrap();

    let mut tickets: Vec<Ticket> = Vec::new();
    for i in 0..4 {
        tickets.push(
            h.service
                .issue_ticket(&queue.id, &format!("user-{i}"))
                .await
                .unwrap(),
        );
    }

    for (i, ticket) in tickets.iter().enumerate() {
        assert_eq!(
            h.service.position_of(&ticket.id).await.unwrap(),
            Some(i as u64 + 1)
        );
    }
}

#[tokio::test]
async fn position_falls_back_to_durable_order_during_an_outage() {
    let h = harness().await;
    let queue = h
        .service
        .create_queue("Library", "Main desk", None)
        .await
        .unwrap();

    let mut tickets: Vec<Ticket> = Vec::new();
    for i in 0..3 {
        tickets.push(
            h.service
                .issue_ticket(&queue.id, &format!("user-{i}"))
                .await
                .unwrap(),
        );
    }

    h.cache.set_available(false);
    for (i, ticket) in tickets.iter().enumerate() {
        assert_eq!(
            h.service.position_of(&ticket.id).await.unwrap(),
            Some(i as u64 + 1),
            "durable fallback must agree with the index"
        );
    }
}

#[tokio::test]
async fn rebuild_from_durable_tickets_reproduces_the_ordering() {
    let h = harness().await;
    let queue = h
        .service
        .create_queue("Library", "Main desk", None)
        .await
        .unwrap();

    // Issue while the cache is down: the index never sees these tickets
    h.cache.set_available(false);
    let mut tickets: Vec<Ticket> = Vec::new();
    for i in 0..3 {
        tickets.push(
            h.service
                .issue_ticket(&queue.id, &format!("user-{i}"))
                .await
                .unwrap(),
        );
    }
    h.cache.set_available(true);

    let replayed = h.service.rebuild_index(&queue.id).await.unwrap();
    assert_eq!(replayed, 3);

    // Index-served positions match the durable WAITING order
    let waiting = h.ticket_repo.find_waiting_by_queue(&queue.id).await.unwrap();
    assert_eq!(waiting.len(), 3);
    for (i, ticket) in waiting.iter().enumerate() {
        assert_eq!(
            h.service.position_of(&ticket.id).await.unwrap(),
            Some(i as u64 + 1)
        );
    }
}

#[tokio::test]
async fn now_serving_reads_as_unknown_during_an_outage() {
    let h = harness().await;
    let queue = h
        .service
        .create_queue("Library", "Main desk", None)
        .await
        .unwrap();

    h.cache.set_available(false);
    assert_eq!(h.service.now_serving(&queue.id).await.unwrap(), None);
}
