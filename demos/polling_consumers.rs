use std::{sync::Arc, thread, time::Duration};

use fairq::{FairQueue, TryTakeError};
use tracing_subscriber::EnvFilter;

const NUM_PRODUCERS: usize = 2;
const NUM_CONSUMERS: usize = 2;
const NUM_ELEMENTS_PER_PRODUCER: usize = 8;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let queue = Arc::new(FairQueue::new());

    let mut producers = vec![];
    let mut consumers = vec![];

    for start in 0..NUM_PRODUCERS {
        let queue = Arc::clone(&queue);
        producers.push(thread::spawn(move || {
            let mut current_value = start;
            for _ in 0..NUM_ELEMENTS_PER_PRODUCER {
                queue.put(current_value);

                current_value = current_value.wrapping_add(NUM_PRODUCERS);
                thread::sleep(Duration::from_millis(1));
            }
        }));
    }

    for _ in 0..NUM_CONSUMERS {
        let queue = Arc::clone(&queue);
        consumers.push(thread::spawn(move || {
            let mut values = vec![];
            let (mut empty, mut reserved) = (0, 0);
            loop {
                match queue.try_take() {
                    Ok(value) => values.push(value),
                    Err(TryTakeError::Empty) => empty += 1,
                    Err(TryTakeError::Reserved) => reserved += 1,
                }

                // stop once nothing arrives for a while
                match queue.take_timeout(Duration::from_millis(50)) {
                    Ok(value) => values.push(value),
                    Err(_) => break,
                }
            }
            tracing::info!(received = values.len(), empty, reserved, "consumer finished");
            values
        }));
    }

    producers.into_iter().for_each(|p| p.join().unwrap());

    let mut all_values = vec![];
    for consumer in consumers {
        let Ok(some_values) = consumer.join() else {
            continue;
        };

        all_values.extend(some_values);
    }

    // anything the consumers gave up on is still in the queue
    let leftovers = Arc::into_inner(queue).map_or(0, FairQueue::destroy);
    all_values.sort_unstable();
    all_values.dedup();

    println!(
        "Got out {} unique values, {} left behind",
        all_values.len(),
        leftovers
    );
}
