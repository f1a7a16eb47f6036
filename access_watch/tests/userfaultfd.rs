// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Integration tests against the host userfaultfd. Skipped when the host does not allow it.

#![cfg(all(feature = "uffd", any(target_os = "android", target_os = "linux")))]

mod common;

use std::sync::mpsc;
use std::time::Duration;

use access_watch::is_supported_with;
use access_watch::IdleCallbackResult;
use access_watch::MemoryAccessWatch;
use access_watch::Userfaultfd;
use access_watch::WatchConfig;
use base::pagesize;
use common::*;

fn host_config() -> Option<WatchConfig> {
    let config = WatchConfig {
        user_mode_only: true,
        ..Default::default()
    };
    if is_supported_with(&config) {
        Some(config)
    } else {
        println!("userfaultfd is not available, skipping");
        None
    }
}

#[test]
fn fill_registered_pages() {
    let config = match host_config() {
        Some(config) => config,
        None => return,
    };
    let mapping = AnonymousMapping::new(2 * pagesize());
    let mut watch = MemoryAccessWatch::<Userfaultfd>::with_config(
        config,
        |_, _| {},
        |_| IdleCallbackResult::AllDone,
    );
    assert!(watch.valid());
    // SAFETY:
    // The mapping outlives the watch and holds nothing yet.
    assert!(unsafe { watch.register_memory_range(mapping.addr, mapping.len) });

    let data = vec![0xa5; pagesize()];
    assert!(watch.fill_page(mapping.addr, pagesize(), Some(&data), false));
    assert!(watch.fill_page(mapping.addr + pagesize(), pagesize(), None, false));
    // Already present.
    assert!(watch.fill_page(mapping.addr, pagesize(), None, false));

    assert_eq!(read_byte(mapping.addr), 0xa5);
    assert_eq!(read_byte(mapping.addr + pagesize() - 1), 0xa5);
    assert_eq!(read_byte(mapping.addr + pagesize()), 0);
}

#[test]
fn fill_unregistered_page_fails() {
    let config = match host_config() {
        Some(config) => config,
        None => return,
    };
    let mapping = AnonymousMapping::new(pagesize());
    let watch = MemoryAccessWatch::<Userfaultfd>::with_config(
        config,
        |_, _| {},
        |_| IdleCallbackResult::AllDone,
    );

    assert!(!watch.fill_page(mapping.addr, pagesize(), None, false));
}

#[test]
fn touching_a_page_reaches_access_callback() {
    let config = match host_config() {
        Some(config) => config,
        None => return,
    };
    let mapping = AnonymousMapping::new(4 * pagesize());
    let (tx, rx) = mpsc::channel();
    let mut watch = MemoryAccessWatch::<Userfaultfd>::with_config(
        config,
        move |filler, addr| {
            let data = vec![0x3c; pagesize()];
            assert!(filler.fill_page(addr, pagesize(), Some(&data), false));
            tx.send(addr).unwrap();
        },
        |_| IdleCallbackResult::Wait,
    );
    // SAFETY:
    // The mapping outlives the watch and holds nothing yet.
    assert!(unsafe { watch.register_memory_range(mapping.addr, mapping.len) });
    watch.done_registering();

    let target = mapping.addr + 2 * pagesize() + 17;
    let value = run_with_timeout(5_000, move || read_byte(target));

    assert_eq!(value, 0x3c);
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(1)).unwrap(),
        mapping.addr + 2 * pagesize()
    );
    drop(watch);
    // Unregistered pages read as fresh anonymous memory.
    assert_eq!(read_byte(mapping.addr), 0);
}

#[test]
fn idle_callback_loads_everything() {
    let config = match host_config() {
        Some(config) => config,
        None => return,
    };
    let mapping = AnonymousMapping::new(4 * pagesize());
    let base_addr = mapping.addr;
    let mut next = 0;
    let mut watch = MemoryAccessWatch::<Userfaultfd>::with_config(
        config,
        |_, _| {},
        move |filler| {
            if next == 4 {
                return IdleCallbackResult::AllDone;
            }
            let data = vec![next as u8 + 1; pagesize()];
            filler.fill_page_bulk(base_addr + next * pagesize(), pagesize(), Some(&data), true);
            next += 1;
            IdleCallbackResult::RunAgain
        },
    );
    // SAFETY:
    // The mapping outlives the watch and holds nothing yet.
    assert!(unsafe { watch.register_memory_range(mapping.addr, mapping.len) });
    assert!(watch.init_bulk_fill(mapping.addr, mapping.len));
    watch.done_registering();

    run_with_timeout(5_000, move || watch.join());

    let pages: Vec<u8> = (0..4)
        .map(|page| read_byte(base_addr + page * pagesize()))
        .collect();
    assert_eq!(pages, vec![1, 2, 3, 4]);
}
