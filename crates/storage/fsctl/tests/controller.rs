//! Controller behaviour against the in-memory backend

use omega_fsctl::{
    Controller, ControllerConfig, FileHandle, FsError, OpenMode, RamBackend, ReadMode,
    SharedController,
};

const RO: OpenMode = OpenMode::READING;

fn overwrite() -> OpenMode {
    OpenMode::WRITING | OpenMode::OVERWRITE
}

fn with_file(path: &str, data: &[u8]) -> Controller<RamBackend> {
    let mut ram = RamBackend::new();
    ram.insert_file(path, data);
    Controller::init(ram)
}

// ============================================================================
// OPEN / CLOSE
// ============================================================================

#[test]
fn test_open_missing_read_only_then_create() {
    let mut ctl = Controller::init(RamBackend::new());
    assert_eq!(ctl.open_file("new.txt", RO), Err(FsError::FileNotExist));

    let fh = ctl.open_file("new.txt", overwrite()).unwrap();
    assert!(fh.is_valid());
    assert!(ctl.backend().exists("new.txt"));
    ctl.close_file(fh).unwrap();
}

#[test]
fn test_invalid_mode_never_reaches_backend() {
    let mut ctl = Controller::init(RamBackend::new());
    for mode in [
        OpenMode::WRITING,
        OpenMode::APPEND | OpenMode::OVERWRITE,
        OpenMode::WRITING | OpenMode::APPEND | OpenMode::OVERWRITE,
        OpenMode::empty(),
    ] {
        assert_eq!(ctl.open_file("x", mode), Err(FsError::InvalidOpenMode));
    }
    assert_eq!(ctl.backend().stats().total(), 0);
}

#[test]
fn test_invalid_path() {
    let mut ctl = Controller::init(RamBackend::new());
    assert_eq!(ctl.open_file("", overwrite()), Err(FsError::InvalidParameters));
    assert_eq!(ctl.backend().stats().opens, 0);
}

#[test]
fn test_double_close() {
    let mut ctl = with_file("f", b"data");
    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(ctl.close_file(fh), Ok(()));
    assert_eq!(ctl.close_file(fh), Err(FsError::FileHandleNotExist));
    assert_eq!(ctl.close_file(FileHandle::INVALID), Err(FsError::FileHandleNotExist));
    assert_eq!(ctl.backend().stats().closes, 1);
}

#[test]
fn test_stale_handle_after_reopen() {
    let mut ctl = with_file("f", b"data");
    let old = ctl.open_file("f", RO).unwrap();
    ctl.close_file(old).unwrap();
    let new = ctl.open_file("f", RO).unwrap();

    assert_ne!(old, new);
    assert_eq!(ctl.read_file(old, ReadMode::All, 0).err(), Some(FsError::FileHandleNotExist));
    assert_eq!(&*ctl.read_file(new, ReadMode::All, 0).unwrap(), b"data");
}

#[test]
fn test_handle_table_full() {
    let cfg = ControllerConfig::new().with_max_open_files(2);
    let mut ctl = Controller::with_config(RamBackend::new(), cfg);
    ctl.open_file("a", overwrite()).unwrap();
    ctl.open_file("b", overwrite()).unwrap();
    assert_eq!(ctl.open_file("c", overwrite()), Err(FsError::NoMem));
    // Rejected before the backend allocated anything
    assert_eq!(ctl.backend().open_descriptors(), 2);
}

#[test]
fn test_backend_out_of_descriptors() {
    let mut ctl = Controller::init(RamBackend::new().with_max_descriptors(1));
    ctl.open_file("a", overwrite()).unwrap();
    assert_eq!(ctl.open_file("b", overwrite()), Err(FsError::NoMem));
    assert_eq!(ctl.open_count(), 1);
}

#[test]
fn test_close_failure_still_releases() {
    let mut ctl = with_file("f", b"data");
    let fh = ctl.open_file("f", RO).unwrap();
    ctl.backend_mut().set_fail_closes(true);
    assert_eq!(ctl.close_file(fh), Err(FsError::Failed));
    assert_eq!(ctl.close_file(fh), Err(FsError::FileHandleNotExist));
    assert_eq!(ctl.open_count(), 0);
}

#[test]
fn test_deinit_closes_everything() {
    let mut ctl = with_file("f", b"data");
    ctl.open_file("f", RO).unwrap();
    ctl.open_file("g", overwrite()).unwrap();
    ctl.open_file("h", OpenMode::WRITING | OpenMode::APPEND).unwrap();

    let ram = ctl.deinit();
    assert_eq!(ram.open_descriptors(), 0);
    assert_eq!(ram.stats().closes, 3);
}

#[test]
fn test_close_all_collects_failures() {
    let mut ctl = with_file("f", b"data");
    let a = ctl.open_file("f", RO).unwrap();
    let b = ctl.open_file("f", RO).unwrap();
    ctl.backend_mut().set_fail_closes(true);

    let failures = ctl.close_all();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().any(|(h, e)| *h == a && *e == FsError::Failed));
    assert!(failures.iter().any(|(h, _)| *h == b));
    assert_eq!(ctl.open_count(), 0);
}

// ============================================================================
// READ
// ============================================================================

#[test]
fn test_read_line_normalizes_crlf() {
    let mut ctl = with_file("f", b"a\r\nb\n");
    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"a\n");
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"b\n");
    assert_eq!(ctl.read_file(fh, ReadMode::Line, 0).err(), Some(FsError::EndOfFile));
}

#[test]
fn test_read_line_residual_at_eof() {
    let mut ctl = with_file("f", b"one\ntwo");
    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"one\n");
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"two");
    assert!(ctl.handle_info(fh).unwrap().eof);

    let reads = ctl.backend().stats().reads;
    assert_eq!(ctl.read_file(fh, ReadMode::Line, 0).err(), Some(FsError::EndOfFile));
    assert_eq!(ctl.backend().stats().reads, reads);
}

#[test]
fn test_read_line_crlf_split_across_backend_reads() {
    let mut ram = RamBackend::new();
    ram.insert_file("f", b"ab\r\ncd\r\n");
    ram.set_read_granularity(Some(3));
    let mut ctl = Controller::with_config(ram, ControllerConfig::new().with_read_block_size(3));

    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"ab\n");
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"cd\n");
    assert_eq!(ctl.handle_info(fh).unwrap().read_cursor, 8);
}

#[test]
fn test_read_chunk_short_latches_eof() {
    let mut ctl = with_file("f", b"1234567");
    let fh = ctl.open_file("f", RO).unwrap();
    let chunk = ctl.read_file(fh, ReadMode::Chunk, 10).unwrap();
    assert_eq!(chunk.len(), 7);
    assert_eq!(chunk.as_bytes(), b"1234567");
    assert!(ctl.handle_info(fh).unwrap().eof);
    assert_eq!(ctl.read_file(fh, ReadMode::Chunk, 10).err(), Some(FsError::EndOfFile));
}

#[test]
fn test_read_chunk_exact_then_eof() {
    let mut ctl = with_file("f", b"abcd");
    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Chunk, 2).unwrap(), b"ab");
    assert_eq!(&*ctl.read_file(fh, ReadMode::Chunk, 2).unwrap(), b"cd");
    assert!(!ctl.handle_info(fh).unwrap().eof);
    assert_eq!(ctl.read_file(fh, ReadMode::Chunk, 2).err(), Some(FsError::EndOfFile));
}

#[test]
fn test_read_chunk_spanning_crlf() {
    let mut ctl = with_file("f", b"ab\r\ncd");
    let fh = ctl.open_file("f", RO).unwrap();
    // The chunk edge falls on the \r; it must not leak out
    assert_eq!(&*ctl.read_file(fh, ReadMode::Chunk, 3).unwrap(), b"ab\n");
    assert_eq!(&*ctl.read_file(fh, ReadMode::Chunk, 3).unwrap(), b"cd");
}

#[test]
fn test_read_chunk_zero_size() {
    let mut ctl = with_file("f", b"abcd");
    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(ctl.read_file(fh, ReadMode::Chunk, 0).err(), Some(FsError::InvalidParameters));
}

#[test]
fn test_read_all() {
    let mut ram = RamBackend::new();
    ram.insert_file("f", b"x\r\ny\r\nz");
    ram.set_read_granularity(Some(2));
    let mut ctl = Controller::init(ram);

    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::All, 0).unwrap(), b"x\ny\nz");
    let info = ctl.handle_info(fh).unwrap();
    assert!(info.eof);
    assert_eq!(info.read_cursor, 7);
    assert_eq!(ctl.read_file(fh, ReadMode::All, 0).err(), Some(FsError::EndOfFile));
}

#[test]
fn test_read_all_empty_file() {
    let mut ctl = with_file("f", b"");
    let fh = ctl.open_file("f", RO).unwrap();
    assert!(ctl.read_file(fh, ReadMode::All, 0).unwrap().is_empty());
    assert_eq!(ctl.read_file(fh, ReadMode::All, 0).err(), Some(FsError::EndOfFile));
}

#[test]
fn test_read_failure_preserves_cursor() {
    let mut ctl = with_file("f", b"abcdef");
    ctl.backend_mut().set_read_granularity(Some(2));
    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Chunk, 2).unwrap(), b"ab");

    ctl.backend_mut().set_fail_reads(true);
    assert_eq!(ctl.read_file(fh, ReadMode::All, 0).err(), Some(FsError::Failed));
    assert_eq!(ctl.read_file(fh, ReadMode::Line, 0).err(), Some(FsError::Failed));
    let info = ctl.handle_info(fh).unwrap();
    assert_eq!(info.read_cursor, 2);
    assert!(!info.eof);

    // Retry picks up exactly where the failed call left off
    ctl.backend_mut().set_fail_reads(false);
    assert_eq!(&*ctl.read_file(fh, ReadMode::All, 0).unwrap(), b"cdef");
}

#[test]
fn test_read_all_over_limit_is_nomem() {
    let cfg = ControllerConfig::new().with_max_buffer_size(4);
    let mut ram = RamBackend::new();
    ram.insert_file("f", b"0123456789");
    let mut ctl = Controller::with_config(ram, cfg);

    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(ctl.read_file(fh, ReadMode::All, 0).err(), Some(FsError::NoMem));
    assert_eq!(ctl.handle_info(fh).unwrap().read_cursor, 0);
    // Nothing was consumed, smaller reads still work
    assert_eq!(&*ctl.read_file(fh, ReadMode::Chunk, 4).unwrap(), b"0123");
    assert_eq!(ctl.read_file(fh, ReadMode::Chunk, 5).err(), Some(FsError::NoMem));
}

#[test]
fn test_read_into_caller_buffer() {
    let mut ctl = with_file("f", b"line one\r\nline two\r\n");
    let fh = ctl.open_file("f", RO).unwrap();

    let mut small = [0u8; 4];
    assert_eq!(ctl.read_file_into(fh, ReadMode::Line, 0, &mut small), Err(FsError::NoMem));
    assert_eq!(ctl.handle_info(fh).unwrap().read_cursor, 0);

    let mut buf = [0u8; 32];
    let n = ctl.read_file_into(fh, ReadMode::Line, 0, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"line one\n");
    let n = ctl.read_file_into(fh, ReadMode::All, 0, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"line two\n");
}

#[test]
fn test_mixed_modes_keep_cursor() {
    let mut ctl = with_file("f", b"hdr\r\nbody-bytes\r\ntail");
    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"hdr\n");
    assert_eq!(&*ctl.read_file(fh, ReadMode::Chunk, 4).unwrap(), b"body");
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"-bytes\n");
    assert_eq!(&*ctl.read_file(fh, ReadMode::All, 0).unwrap(), b"tail");
}

#[test]
fn test_lone_cr_passes_through() {
    let mut ctl = with_file("f", b"a\rb\r");
    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::All, 0).unwrap(), b"a\rb\r");
}

#[test]
fn test_cr_run_before_lf_collapses() {
    let mut ctl = with_file("f", b"a\r\r\nb\n");
    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"a\n");
    assert_eq!(ctl.handle_info(fh).unwrap().read_cursor, 4);
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"b\n");

    let mut ctl = with_file("f", b"a\r\r\nb\n");
    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Chunk, 2).unwrap(), b"a\n");
    assert_eq!(&*ctl.read_file(fh, ReadMode::Chunk, 2).unwrap(), b"b\n");

    let mut ctl = with_file("f", b"a\r\r\nb\n");
    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::All, 0).unwrap(), b"a\nb\n");
}

#[test]
fn test_cr_run_split_across_backend_reads() {
    let mut ram = RamBackend::new();
    ram.insert_file("f", b"ab\r\r\ncd\r\rx");
    ram.set_read_granularity(Some(3));
    let mut ctl = Controller::with_config(ram, ControllerConfig::new().with_read_block_size(3));

    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"ab\n");
    assert_eq!(&*ctl.read_file(fh, ReadMode::Chunk, 2).unwrap(), b"cd");
    assert_eq!(&*ctl.read_file(fh, ReadMode::All, 0).unwrap(), b"\r\rx");
}

#[test]
fn test_crlf_written_to_flash_reads_back_once() {
    let mut ctl = Controller::init(RamBackend::flash());
    let fh = ctl.open_file("f", overwrite()).unwrap();
    ctl.write_file(fh, b"a\r\nb\n", 5).unwrap();
    ctl.close_file(fh).unwrap();
    assert_eq!(ctl.backend().contents("f"), Some(&b"a\r\r\nb\r\n"[..]));

    let fh = ctl.open_file("f", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"a\n");
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"b\n");
}

#[test]
fn test_release_buffer() {
    let mut ctl = with_file("f", b"abcdef");
    let fh = ctl.open_file("f", RO).unwrap();
    let buf = ctl.read_file(fh, ReadMode::Chunk, 3).unwrap();
    assert!(buf.len() <= buf.capacity());
    assert_eq!(buf.handle(), fh);

    ctl.release_buffer(fh).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Chunk, 3).unwrap(), b"def");
    ctl.close_file(fh).unwrap();
    assert_eq!(ctl.release_buffer(fh), Err(FsError::FileHandleNotExist));
}

// ============================================================================
// WRITE
// ============================================================================

#[test]
fn test_partial_write() {
    let mut ctl = Controller::init(RamBackend::new());
    let fh = ctl.open_file("f", overwrite()).unwrap();
    ctl.backend_mut().set_write_limit(Some(60));

    let data = [b'x'; 100];
    assert_eq!(ctl.write_file(fh, &data, 100), Err(FsError::IncompleteFileWrite(60)));
    assert_eq!(ctl.handle_info(fh).unwrap().bytes_written, 60);
    assert_eq!(ctl.backend().contents("f").map(|c| c.len()), Some(60));
    assert_eq!(ctl.backend().stats().writes, 1);
}

#[test]
fn test_write_backend_failure() {
    let mut ctl = Controller::init(RamBackend::new());
    let fh = ctl.open_file("f", overwrite()).unwrap();
    ctl.backend_mut().set_fail_writes(true);
    assert_eq!(ctl.write_file(fh, b"abc", 3), Err(FsError::Failed));
    assert_eq!(ctl.handle_info(fh).unwrap().bytes_written, 0);
}

#[test]
fn test_write_count_checks() {
    let mut ctl = Controller::init(RamBackend::new());
    let fh = ctl.open_file("f", overwrite()).unwrap();
    assert_eq!(ctl.write_file(fh, b"abc", 4), Err(FsError::InvalidParameters));
    assert_eq!(ctl.write_file(fh, b"abc", 0), Err(FsError::InvalidParameters));
    assert_eq!(ctl.write_file(fh, b"abc", 2), Ok(2));
    assert_eq!(ctl.backend().contents("f"), Some(&b"ab"[..]));
}

#[test]
fn test_wrong_capability_never_reaches_backend() {
    let mut ctl = with_file("f", b"data");
    let ro = ctl.open_file("f", RO).unwrap();
    let wo = ctl.open_file("g", overwrite()).unwrap();
    let before = ctl.backend().stats();

    assert_eq!(ctl.write_file(ro, b"x", 1), Err(FsError::InvalidParameters));
    assert_eq!(ctl.read_file(wo, ReadMode::All, 0).err(), Some(FsError::InvalidParameters));
    let mut buf = [0u8; 8];
    assert_eq!(ctl.read_file_into(wo, ReadMode::Line, 0, &mut buf), Err(FsError::InvalidParameters));

    assert_eq!(ctl.backend().stats(), before);
}

#[test]
fn test_append_preserves_content() {
    let mut ctl = with_file("log", b"boot\n");
    let fh = ctl.open_file("log", OpenMode::WRITING | OpenMode::APPEND).unwrap();
    ctl.write_file(fh, b"ready\n", 6).unwrap();
    ctl.close_file(fh).unwrap();
    assert_eq!(ctl.backend().contents("log"), Some(&b"boot\nready\n"[..]));
}

#[test]
fn test_round_trip_through_flash_backend() {
    let payload = b"first line\nsecond line\n\nlast";
    let mut ctl = Controller::init(RamBackend::flash());

    let fh = ctl.open_file("data.txt", overwrite()).unwrap();
    assert_eq!(ctl.write_file(fh, payload, payload.len()), Ok(payload.len()));
    ctl.close_file(fh).unwrap();

    // Stored with flash line endings
    assert_eq!(
        ctl.backend().contents("data.txt"),
        Some(&b"first line\r\nsecond line\r\n\r\nlast"[..])
    );

    let fh = ctl.open_file("data.txt", RO).unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::All, 0).unwrap(), &payload[..]);
    ctl.close_file(fh).unwrap();
}

#[test]
fn test_read_write_session() {
    let mut ctl = Controller::init(RamBackend::new());
    let fh = ctl
        .open_file("rw", OpenMode::READING | OpenMode::WRITING | OpenMode::OVERWRITE)
        .unwrap();
    ctl.write_file(fh, b"abc\n", 4).unwrap();
    // Shared descriptor position sits at end of file after the write
    assert_eq!(ctl.read_file(fh, ReadMode::Line, 0).err(), Some(FsError::EndOfFile));
    ctl.close_file(fh).unwrap();

    let fh = ctl
        .open_file("rw", OpenMode::READING | OpenMode::WRITING | OpenMode::APPEND)
        .unwrap();
    assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"abc\n");
    ctl.write_file(fh, b"def\n", 4).unwrap();
    ctl.close_file(fh).unwrap();
    assert_eq!(ctl.backend().contents("rw"), Some(&b"abc\ndef\n"[..]));
}

#[test]
fn test_borrowed_backend() {
    let mut ram = RamBackend::new();
    {
        let mut ctl = Controller::init(&mut ram);
        let fh = ctl.open_file("cfg", overwrite()).unwrap();
        ctl.write_file(fh, b"k=v", 3).unwrap();
        ctl.deinit();
    }
    assert_eq!(ram.contents("cfg"), Some(&b"k=v"[..]));
    assert_eq!(ram.open_descriptors(), 0);
}

// ============================================================================
// SHARED CONTROLLER
// ============================================================================

#[test]
fn test_shared_controller_across_threads() {
    use std::sync::Arc;
    use std::thread;

    let shared = Arc::new(SharedController::new(Controller::init(RamBackend::new())));

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let path = format!("worker{}.txt", i);
                let fh = shared.open_file(&path, overwrite()).unwrap();
                let line = format!("worker {}\n", i);
                shared.write_file(fh, line.as_bytes(), line.len()).unwrap();
                shared.close_file(fh).unwrap();

                let fh = shared.open_file(&path, RO).unwrap();
                let data = shared.read_to_vec(fh, ReadMode::Line, 0).unwrap();
                shared.close_file(fh).unwrap();
                data == line.as_bytes()
            })
        })
        .collect();

    for worker in workers {
        assert!(worker.join().unwrap());
    }

    let ctl = Arc::try_unwrap(shared).ok().unwrap().into_inner();
    assert_eq!(ctl.open_count(), 0);
    assert_eq!(ctl.backend().open_descriptors(), 0);
}

#[test]
fn test_shared_read_into() {
    let shared = SharedController::new(with_file("f", b"abc\r\n"));
    let fh = shared.open_file("f", RO).unwrap();
    let mut buf = [0u8; 8];
    let n = shared.read_file_into(fh, ReadMode::All, 0, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"abc\n");
    shared.lock().close_file(fh).unwrap();
}
