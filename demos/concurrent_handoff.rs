use std::{collections::HashSet, thread};

use fairq::FairQueue;
use tracing_subscriber::EnvFilter;

const NUM_PRODUCERS: usize = 2;
const NUM_CONSUMERS: usize = 2;
const NUM_ELEMENTS_PER_PRODUCER: usize = 4;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_thread_names(true)
        .init();

    let queue = FairQueue::with_capacity(NUM_ELEMENTS_PER_PRODUCER);

    let all_values = thread::scope(|s| {
        let mut consumers = vec![];

        for _ in 0..NUM_CONSUMERS {
            let queue = &queue;
            consumers.push(s.spawn(move || {
                let mut values = vec![];
                for _ in 0..NUM_ELEMENTS_PER_PRODUCER * NUM_PRODUCERS / NUM_CONSUMERS {
                    values.push(queue.take());
                }
                values
            }));
        }

        for start in 0..NUM_PRODUCERS {
            let queue = &queue;
            s.spawn(move || {
                let mut current_value = start;
                for _ in 0..NUM_ELEMENTS_PER_PRODUCER {
                    queue.put(current_value);

                    current_value = current_value.wrapping_add(NUM_PRODUCERS);
                }
            });
        }

        let mut all_values = vec![];
        for consumer in consumers {
            let Ok(some_values) = consumer.join() else {
                continue;
            };

            all_values.extend(some_values);
        }

        all_values
    });

    let unique_values = all_values.iter().copied().collect::<HashSet<_>>();
    assert_eq!(unique_values.len(), all_values.len());
    assert_eq!(queue.visited(), NUM_PRODUCERS * NUM_ELEMENTS_PER_PRODUCER);

    println!("Got out {} unique values!", all_values.len());
}
