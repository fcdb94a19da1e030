use std::time::Duration;

use roost::Error;
use tokio::time::sleep;

#[tokio::test]
async fn close_drains_and_closes_idle_connections() -> anyhow::Result<()> {
    let (pool, connector, _handler) = roost_test::pool()?;

    let first = pool.acquire().await?;
    let second = pool.acquire().await?;
    pool.release(first).await?;
    pool.release(second).await?;
    assert_eq!(pool.num_idle(), 2);

    pool.close().await;

    assert!(pool.is_closed());
    assert_eq!(pool.num_idle(), 0);
    for handle in connector.handles() {
        assert!(handle.is_closed());
    }

    Ok(())
}

#[tokio::test]
async fn acquire_on_a_closed_pool_fails() -> anyhow::Result<()> {
    let (pool, _connector, _handler) = roost_test::pool()?;

    pool.close().await;

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, Error::PoolClosed));
    assert!(pool.try_acquire().is_none());

    Ok(())
}

#[tokio::test]
async fn release_after_close_closes_the_connection() -> anyhow::Result<()> {
    let (pool, connector, _handler) = roost_test::pool()?;

    let conn = pool.acquire().await?;
    pool.close().await;

    // Held connections are unaffected by close until they come back.
    assert!(!conn.is_closed());

    pool.release(conn.clone()).await?;
    assert!(conn.is_closed());
    assert!(connector.handles()[0].is_closed());
    assert_eq!(pool.num_idle(), 0);

    Ok(())
}

#[tokio::test]
async fn close_event_cancels_a_pending_wait() -> anyhow::Result<()> {
    let (pool, _connector, _handler) = roost_test::pool()?;

    let mut close_event = pool.close_event();
    let waiter = tokio::spawn(async move {
        close_event.do_until(sleep(Duration::from_secs(60))).await
    });

    // ensure the waiter is parked on the event
    sleep(Duration::from_millis(50)).await;
    pool.close().await;

    let res = waiter.await.expect("waiter task panicked");
    assert!(matches!(res, Err(Error::PoolClosed)));

    Ok(())
}

#[tokio::test]
async fn close_event_on_a_closed_pool_fires_immediately() -> anyhow::Result<()> {
    let (pool, _connector, _handler) = roost_test::pool()?;

    pool.close().await;

    // The future is never even polled.
    let res = pool
        .close_event()
        .do_until(sleep(Duration::from_secs(60)))
        .await;
    assert!(matches!(res, Err(Error::PoolClosed)));

    Ok(())
}
