use std::hint::black_box;

#[inline(never)]
fn read_word(addr: usize) -> usize {
    unsafe { core::ptr::read_volatile(addr as *const usize) }
}

#[inline(never)]
fn walk_list(depth: usize) -> usize {
    if depth == 0 {
        return read_word(black_box(0x10));
    }
    black_box(walk_list(depth - 1)) + 1
}

fn main() {
    unsafe { std::env::set_var("RUST_LOG", "trace") };
    env_logger::init();
    crash_unwind::init().unwrap();
    println!("{}", walk_list(3));
}
