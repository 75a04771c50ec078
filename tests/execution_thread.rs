mod common;

use encore::gpu::headless::HeadlessExecutor;
use encore::{BackendKind, BufferUsage, GpuError, RecordingExecutor};

#[test]
fn global_state_lists_run_on_the_execution_thread() {
    let gpu = common::device(BackendKind::GlobalState);
    let native = gpu.native();
    let buffers = [
        native.create_buffer(16, BufferUsage::STAGING),
        native.create_buffer(16, BufferUsage::STAGING),
    ];

    // Direct submission is refused for thread-affine backends.
    let list = gpu.create_command_list().begin().end();
    let refused = gpu.submit(&list, &mut RecordingExecutor::new());
    assert!(matches!(refused, Err(GpuError::Backend(_))));
    list.dispose();

    let thread = gpu
        .spawn_execution_thread(HeadlessExecutor::new(BackendKind::GlobalState))
        .unwrap();

    std::thread::scope(|s| {
        for (i, buffer) in buffers.iter().enumerate() {
            let gpu = &gpu;
            let thread = &thread;
            s.spawn(move || {
                let mut list = gpu.create_command_list().begin();
                list.update_buffer(buffer, 0, &[i as u8 + 1; 16]).unwrap();
                list.dispatch(1, 1, 1);
                let done = thread.submit(list.end()).unwrap().wait().unwrap();
                assert_eq!(done.result.unwrap().entries, 4);
                done.list.reset();
            });
        }
    });

    thread.wait_idle().unwrap();
    let (lists, dispatches, worker) = thread
        .run(|exec| {
            (
                exec.stats.lists,
                exec.stats.dispatches,
                std::thread::current().name().map(str::to_string),
            )
        })
        .unwrap();
    assert_eq!((lists, dispatches), (2, 2));
    assert_eq!(worker.as_deref(), Some(gpu.info().execution_thread_name.as_str()));

    assert_eq!(buffers[0].read(), vec![1; 16]);
    assert_eq!(buffers[1].read(), vec![2; 16]);
    assert_eq!(gpu.staging_pool().lock().rented_count(), 0);

    let exec = thread.shutdown().unwrap();
    assert_eq!(exec.stats.lists, 2);
}

#[test]
fn unclaimed_submissions_release_their_blocks() {
    let gpu = common::device(BackendKind::GlobalState);
    let buffer = gpu.native().create_buffer(64, BufferUsage::STAGING);
    let thread = gpu
        .spawn_execution_thread(HeadlessExecutor::new(BackendKind::GlobalState))
        .unwrap();

    for _ in 0..8 {
        let mut list = gpu.create_command_list().begin();
        list.update_buffer(&buffer, 0, &[7; 64]).unwrap();
        drop(thread.submit(list.end()).unwrap());
    }
    drop(thread);

    assert_eq!(buffer.read(), vec![7; 64]);
    let pool = gpu.staging_pool().lock();
    assert_eq!(pool.rented_count(), 0);
    assert_eq!(pool.free_count(), pool.allocated_count());
}
