use roost::Error;

#[tokio::test]
async fn unhealthy_candidate_is_closed_and_the_next_one_tried() -> anyhow::Result<()> {
    let (pool, connector, handler) = roost_test::pool()?;

    let first = pool.acquire().await?;
    let second = pool.acquire().await?;
    pool.release(first.clone()).await?;
    pool.release(second.clone()).await?;

    // LIFO will pop `second` first; make it fail its health check.
    connector.handles()[1].set_active(false);

    let picked = pool.acquire().await?;
    assert!(picked.same(&first), "healthy candidate comes out");
    assert!(second.is_closed(), "unhealthy candidate is closed");
    assert_eq!(connector.connects(), 2, "no fresh connect was needed");

    // Two initial acquires plus the retry's single success.
    let (_, acquired, _) = handler.counts();
    assert_eq!(acquired, 3);

    Ok(())
}

#[tokio::test]
async fn draining_all_unhealthy_candidates_falls_through_to_connect() -> anyhow::Result<()> {
    let (pool, connector, _handler) = roost_test::pool()?;

    let first = pool.acquire().await?;
    let second = pool.acquire().await?;
    pool.release(first.clone()).await?;
    pool.release(second.clone()).await?;

    for handle in connector.handles() {
        handle.set_active(false);
    }

    let fresh = pool.acquire().await?;
    assert!(!fresh.same(&first));
    assert!(!fresh.same(&second));
    assert_eq!(connector.connects(), 3);
    assert_eq!(pool.num_idle(), 0);

    Ok(())
}

#[tokio::test]
async fn connect_failure_surfaces_to_the_caller() -> anyhow::Result<()> {
    let (pool, connector, handler) = roost_test::pool()?;

    connector.set_fail(true);

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(handler.counts(), (0, 0, 0));

    Ok(())
}

#[tokio::test]
async fn acquired_callback_failure_closes_the_connection() -> anyhow::Result<()> {
    let (pool, connector, handler) = roost_test::pool()?;

    let conn = pool.acquire().await?;
    pool.release(conn.clone()).await?;

    handler.set_fail_acquired(true);

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert!(conn.is_closed());
    assert!(connector.handles()[0].is_closed());

    Ok(())
}

#[tokio::test]
async fn created_callback_failure_fails_the_acquire() -> anyhow::Result<()> {
    let (pool, connector, handler) = roost_test::pool()?;

    handler.set_fail_created(true);

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert!(connector.handles()[0].is_closed());

    Ok(())
}
