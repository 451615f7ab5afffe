use crash_unwind::arch::{Registers, current_frame_pointer};
use crash_unwind::probe::{Probe, ProbeChannel};
use crash_unwind::walk::{FRAME_RECORD_SIZE, Frame, StackWalker};
use rstest::rstest;

/// Accepts any non-null address; only for chains built in test memory.
struct TrustingProbe;

impl Probe for TrustingProbe {
    fn is_readable(&self, addr: usize, _len: usize) -> bool {
        addr != 0
    }
}

/// Builds `depth` linked frame records ending in a zero frame pointer.
/// Record `i` returns to `0x1000 + i`.
fn synthetic_chain(depth: usize) -> Vec<[usize; 2]> {
    let mut records = vec![[0usize; 2]; depth];
    let base = records.as_ptr() as usize;
    for (idx, record) in records.iter_mut().enumerate() {
        record[0] = if idx + 1 == depth {
            0
        } else {
            base + (idx + 1) * FRAME_RECORD_SIZE
        };
        record[1] = 0x1000 + idx;
    }
    records
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(16)]
#[case(100)]
fn synthetic_chain_yields_every_frame(#[case] depth: usize) {
    let channel = ProbeChannel::open().unwrap();
    let records = synthetic_chain(depth);
    let base = records.as_ptr() as usize;

    let frames: Vec<Frame> = StackWalker::new(&*channel, base, 0xdead).collect();
    assert_eq!(frames.len(), depth);
    assert_eq!(
        frames[0],
        Frame {
            frame_pointer: base,
            program_counter: 0xdead
        }
    );
    for (idx, frame) in frames.iter().enumerate().skip(1) {
        assert_eq!(frame.frame_pointer, base + idx * FRAME_RECORD_SIZE);
        assert_eq!(frame.program_counter, 0x1000 + idx - 1);
    }
}

#[rstest]
fn zero_frame_pointer_yields_nothing() {
    let mut walker = StackWalker::new(&TrustingProbe, 0, 0x1234);
    assert!(walker.next().is_none());
    assert!(walker.next().is_none());
}

#[rstest]
fn walk_stops_at_unreadable_frame() {
    let channel = ProbeChannel::open().unwrap();
    let mut records = synthetic_chain(3);
    // Last record points into page zero instead of ending the chain.
    records[2][0] = 0x10;
    let base = records.as_ptr() as usize;
    assert_eq!(StackWalker::new(&*channel, base, 0).count(), 3);
}

#[rstest]
fn cyclic_chain_is_bounded_by_take() {
    let mut records = synthetic_chain(2);
    let base = records.as_ptr() as usize;
    records[1][0] = base;
    let frames: Vec<Frame> = StackWalker::new(&TrustingProbe, base, 0).take(10).collect();
    assert_eq!(frames.len(), 10);
    assert_eq!(frames[2].frame_pointer, base);
}

#[rstest]
fn starts_from_register_context() {
    let records = synthetic_chain(4);
    let regs = Registers {
        frame_pointer: records.as_ptr() as usize,
        instruction_pointer: 0x4242,
    };
    let mut walker = StackWalker::from_context(&TrustingProbe, &regs);
    assert_eq!(walker.next().unwrap().program_counter, 0x4242);
    assert_eq!(walker.count(), 3);
}

#[inline(never)]
fn recurse(depth: usize, channel: &ProbeChannel) -> usize {
    if depth == 0 {
        let fp = current_frame_pointer();
        return StackWalker::new(&**channel, fp, 0)
            .take(256)
            .count();
    }
    std::hint::black_box(recurse(depth - 1, channel))
}

#[rstest]
fn walks_the_live_stack() {
    let channel = ProbeChannel::open().unwrap();
    // Each level of recursion adds a frame record to the chain.
    assert!(recurse(8, &channel) > 8);
}
