//! Checks, with an allocator that scans every freed block, that secret bytes
//! are wiped before their memory goes back to the system allocator.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use nativeconfig::{BoundaryAdapter, ConfigStore, SecretBuffer, StoreConfig};
use zeroize::Zeroizing;

const PATTERN: &[u8] = b"secret123";

static ARMED: AtomicBool = AtomicBool::new(false);
static SIGHTINGS: AtomicUsize = AtomicUsize::new(0);

struct ScanningAllocator;

unsafe impl GlobalAlloc for ScanningAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if ARMED.load(Ordering::SeqCst) && layout.size() >= PATTERN.len() {
            let block = std::slice::from_raw_parts(ptr, layout.size());
            if block.windows(PATTERN.len()).any(|w| w == PATTERN) {
                SIGHTINGS.fetch_add(1, Ordering::SeqCst);
            }
        }
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: ScanningAllocator = ScanningAllocator;

fn armed<F: FnOnce()>(f: F) -> usize {
    SIGHTINGS.store(0, Ordering::SeqCst);
    ARMED.store(true, Ordering::SeqCst);
    f();
    ARMED.store(false, Ordering::SeqCst);
    SIGHTINGS.load(Ordering::SeqCst)
}

// A single test keeps other test threads from freeing memory while armed.
#[test]
fn released_secrets_leave_no_trace_in_freed_memory() {
    // The scanner itself must notice an ordinary, unwiped allocation.
    let seen = armed(|| {
        let plain = PATTERN.to_vec();
        std::hint::black_box(&plain);
        drop(plain);
    });
    assert!(seen >= 1, "scanner failed to see an unwiped block");

    let seen = armed(|| {
        let buffer = SecretBuffer::from_slice(PATTERN);
        std::hint::black_box(&buffer);
        drop(buffer);
    });
    assert_eq!(seen, 0, "dropped SecretBuffer left its content behind");

    let seen = armed(|| {
        let mut buffer = SecretBuffer::from_slice(PATTERN);
        buffer.overwrite(b"a different, longer value");
        std::hint::black_box(&buffer);
        buffer.overwrite(b"");
        drop(buffer);
    });
    assert_eq!(seen, 0, "overwritten SecretBuffer left its content behind");

    let seen = armed(|| {
        let buffer = SecretBuffer::from(PATTERN.to_vec());
        std::hint::black_box(&buffer);
    });
    assert_eq!(seen, 0, "vector handed to SecretBuffer was not wiped");

    let store = ConfigStore::in_memory(&StoreConfig::default()).expect("store should open");
    let seen = armed(|| {
        store.token().set("secret123").unwrap();
        let copy = store.token().get().unwrap().unwrap();
        std::hint::black_box(&copy);
        drop(copy);
        store.token().set("replacement-value").unwrap();
        store.token().set("secret123").unwrap();
        store.token().clear().unwrap();
        store.token().set("secret123").unwrap();
    });
    assert_eq!(seen, 0, "store slot leaked a replaced or cleared token");

    let seen = armed(|| {
        let adapter = BoundaryAdapter::new(&store);
        adapter.set_token(PATTERN).unwrap();
        let handed_out = Zeroizing::new(adapter.get_token().unwrap());
        std::hint::black_box(&handed_out);
        drop(handed_out);
        drop(store);
    });
    assert_eq!(seen, 0, "boundary round trip or store drop leaked the token");
}
