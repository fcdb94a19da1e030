use std::time::Duration;

use tokio::time::sleep;

/// Churn one pool from many tasks and check that nothing leaks: every
/// connection the connector ever opened ends up either parked or closed.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_churn_leaks_nothing() -> anyhow::Result<()> {
    let (pool, connector, handler) = roost_test::pool()?;

    let mut handles = vec![];
    for _ in 0..8 {
        let pool = pool.clone();
        let handle = tokio::spawn(async move {
            for _ in 0..25 {
                let conn = pool.acquire().await?;
                sleep(Duration::from_micros(100)).await;
                pool.release(conn).await?;
            }
            anyhow::Ok(())
        });
        handles.push(handle);
    }

    let results = futures::future::join_all(handles).await;
    for result in results {
        result??;
    }

    let open = connector
        .handles()
        .iter()
        .filter(|handle| !handle.is_closed())
        .count();
    assert_eq!(open, pool.num_idle());
    assert!(handler.all_on_executor());

    Ok(())
}

/// Cancellation under churn: cancelled acquires must still account for
/// every produced connection.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_cancellation_leaks_nothing() -> anyhow::Result<()> {
    let (pool, connector, _handler) = roost_test::pool()?;
    connector.set_delay(Some(Duration::from_millis(2)));

    for _ in 0..20 {
        let (tx, rx) = tokio::sync::oneshot::channel();
        pool.acquire_into(tx);
        drop(rx);
    }

    // Let the in-flight connects land and give their connections back.
    sleep(Duration::from_millis(500)).await;

    let open = connector
        .handles()
        .iter()
        .filter(|handle| !handle.is_closed())
        .count();
    assert_eq!(open, connector.connects());
    assert_eq!(pool.num_idle(), connector.connects());

    Ok(())
}
