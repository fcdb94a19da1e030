use roost::{Connection, Error, IdleStore};

#[tokio::test]
async fn cross_pool_release_fails_and_closes() -> anyhow::Result<()> {
    let (pool_a, _connector_a, _handler_a) = roost_test::pool()?;
    let (pool_b, _connector_b, _handler_b) = roost_test::pool()?;

    let conn = pool_a.acquire().await?;

    let err = pool_b.release(conn.clone()).await.unwrap_err();
    assert!(matches!(err, Error::MisusedRelease));
    assert!(conn.is_closed());
    assert_eq!(pool_a.num_idle(), 0, "the stray never lands in pool A");
    assert_eq!(pool_b.num_idle(), 0);

    Ok(())
}

#[tokio::test]
async fn double_release_fails_the_second_call() -> anyhow::Result<()> {
    let (pool, connector, _handler) = roost_test::pool()?;

    let conn = pool.acquire().await?;
    pool.release(conn.clone()).await?;

    let err = pool.release(conn.clone()).await.unwrap_err();
    assert!(matches!(err, Error::MisusedRelease));
    assert!(conn.is_closed());

    // The churned connection is still parked but dead; the next acquire
    // skips it and opens a replacement.
    let replacement = pool.acquire().await?;
    assert!(!replacement.same(&conn));
    assert_eq!(connector.connects(), 2);

    Ok(())
}

#[tokio::test]
async fn unhealthy_release_discards_but_succeeds() -> anyhow::Result<()> {
    let (pool, connector, handler) = roost_test::pool()?;

    let conn = pool.acquire().await?;
    connector.handles()[0].set_active(false);

    pool.release(conn.clone()).await?;

    assert_eq!(pool.num_idle(), 0, "broken connection is not parked");
    let (_, _, released) = handler.counts();
    assert_eq!(released, 1, "on_released still fires for a discard");
    assert!(!conn.is_closed(), "discard does not explicitly close");

    Ok(())
}

#[tokio::test]
async fn release_without_health_check_parks_directly() -> anyhow::Result<()> {
    let connector = roost_test::TestConnector::new();
    let pool = roost_test::roost()
        .release_health_check(false)
        .open(connector.clone())?;

    let conn = pool.acquire().await?;
    connector.handles()[0].set_active(false);

    // No health gate: even a dead transport goes back to the store.
    pool.release(conn).await?;
    assert_eq!(pool.num_idle(), 1);

    Ok(())
}

struct RejectingStore;

impl IdleStore for RejectingStore {
    fn offer(&self, _conn: Connection) -> bool {
        false
    }

    fn poll(&self) -> Option<Connection> {
        None
    }

    fn len(&self) -> usize {
        0
    }
}

#[tokio::test]
async fn rejected_offer_surfaces_pool_full_and_closes() -> anyhow::Result<()> {
    let connector = roost_test::TestConnector::new();
    let handler = roost_test::RecordingHandler::new();
    let pool = roost_test::roost()
        .idle_store(RejectingStore)
        .handler(handler.clone())
        .open(connector.clone())?;

    let conn = pool.acquire().await?;

    let err = pool.release(conn.clone()).await.unwrap_err();
    assert!(matches!(err, Error::PoolFull));
    assert!(conn.is_closed());

    let (_, _, released) = handler.counts();
    assert_eq!(released, 0, "a declined connection was never parked");

    Ok(())
}

#[tokio::test]
async fn released_callback_failure_closes_and_fails() -> anyhow::Result<()> {
    let (pool, connector, handler) = roost_test::pool()?;

    let conn = pool.acquire().await?;
    handler.set_fail_released(true);

    let err = pool.release(conn.clone()).await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert!(conn.is_closed());
    assert!(connector.handles()[0].is_closed());

    Ok(())
}
