use roost_test::EventKind;

#[tokio::test]
async fn warm_reuse_hits_the_connector_once() -> anyhow::Result<()> {
    let (pool, connector, handler) = roost_test::pool()?;

    let conn = pool.acquire().await?;
    pool.release(conn.clone()).await?;

    let again = pool.acquire().await?;
    assert!(again.same(&conn), "second acquire must reuse the idle connection");
    pool.release(again).await?;

    assert_eq!(connector.connects(), 1);
    assert_eq!(handler.counts(), (1, 2, 2));

    Ok(())
}

#[tokio::test]
async fn callbacks_run_on_the_bound_executor() -> anyhow::Result<()> {
    let (pool, _connector, handler) = roost_test::pool()?;

    let conn = pool.acquire().await?;
    pool.release(conn).await?;
    let conn = pool.acquire().await?;
    pool.release(conn).await?;

    assert!(handler.all_on_executor());

    // Created before the first acquire, acquire before release per cycle.
    let kinds: Vec<EventKind> = handler.events().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Created,
            EventKind::Acquired,
            EventKind::Released,
            EventKind::Acquired,
            EventKind::Released,
        ]
    );

    Ok(())
}

#[tokio::test]
async fn lifo_hands_out_the_most_recently_released() -> anyhow::Result<()> {
    let (pool, connector, _handler) = roost_test::pool()?;

    let first = pool.acquire().await?;
    let second = pool.acquire().await?;
    assert_eq!(connector.connects(), 2);

    pool.release(first.clone()).await?;
    pool.release(second.clone()).await?;

    let picked = pool.acquire().await?;
    assert!(picked.same(&second));

    Ok(())
}

#[tokio::test]
async fn fifo_hands_out_the_least_recently_released() -> anyhow::Result<()> {
    let connector = roost_test::TestConnector::new();
    let pool = roost_test::roost().lifo(false).open(connector.clone())?;

    let first = pool.acquire().await?;
    let second = pool.acquire().await?;

    pool.release(first.clone()).await?;
    pool.release(second.clone()).await?;

    let picked = pool.acquire().await?;
    assert!(picked.same(&first));

    Ok(())
}

#[tokio::test]
async fn try_acquire_returns_parked_connections_only() -> anyhow::Result<()> {
    let (pool, _connector, handler) = roost_test::pool()?;

    assert!(pool.try_acquire().is_none(), "nothing parked yet");

    let conn = pool.acquire().await?;
    pool.release(conn.clone()).await?;

    let picked = pool.try_acquire().expect("one connection is parked");
    assert!(picked.same(&conn));
    assert!(pool.try_acquire().is_none());

    // The on_acquired callback is queued behind the handout; give the
    // executor a moment to run it.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let (_, acquired, _) = handler.counts();
    assert_eq!(acquired, 2);

    Ok(())
}
