use std::sync::{Arc, Barrier};

use axerrno::LinuxError;
use chardev::{ChardevModule, DEVICE_NAME, THIS_MODULE};
use kapi::{ChrdevTable, ModuleOwner, chrdev_open};
use kmod::{
    CharDevRegistry, FileMode, FileOperations, KernelModule, ModuleArgs, ModuleContext,
    ModuleState, ThisModule,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn leak_module(name: &'static str) -> &'static ThisModule {
    Box::leak(Box::new(ThisModule::new(name, None, None)))
}

fn init_with(
    table: &ChrdevTable,
    module: &'static ThisModule,
    args: &str,
) -> Result<ChardevModule, LinuxError> {
    let args = ModuleArgs::parse(module.name(), args);
    let ctx = ModuleContext {
        module,
        args: &args,
        chrdev: table,
    };
    ChardevModule::init(&ctx)
}

/// The only test driving the module's own `THIS_MODULE`.
#[test]
fn module_lifecycle() {
    init_logger();
    let table = ChrdevTable::new();
    let owner = ModuleOwner::load(&THIS_MODULE, "", &table).unwrap();
    assert_eq!(owner.name(), "chardev");
    assert_eq!(THIS_MODULE.state(), ModuleState::Live);

    let major = table.major_of(DEVICE_NAME).unwrap();
    assert_eq!(major, 254);
    assert_eq!(table.proc_devices(), "Character devices:\n254 chardev\n");

    // first session: the whole message in one read, then end of stream
    let mut file = chrdev_open(&table, major, 0, FileMode::READ).unwrap();
    let mut buf = [0u8; 1000];
    let n = file.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"I already told you 0 times Hello world!\n");
    assert_eq!(file.read(&mut buf), Ok(0));
    assert_eq!(file.read(&mut buf), Ok(0));

    // a second opener is turned away and the holder is unaffected
    assert!(matches!(
        chrdev_open(&table, major, 0, FileMode::READ),
        Err(LinuxError::EBUSY)
    ));
    assert_eq!(THIS_MODULE.refcount(), 2);

    // the module cannot go while the session is open
    assert_eq!(owner.unload(), Err(LinuxError::EBUSY));
    assert_eq!(file.close(), Ok(()));
    assert_eq!(THIS_MODULE.refcount(), 0);

    // second session sees the counter advanced
    let mut file =
        chrdev_open(&table, major, 1, FileMode::READ | FileMode::WRITE).unwrap();
    assert_eq!(
        file.read_to_end().unwrap(),
        b"I already told you 1 times Hello world!\n"
    );
    assert_eq!(file.write(b"hello"), Err(LinuxError::EINVAL));
    drop(file);

    assert_eq!(owner.unload(), Ok(()));
    assert_eq!(THIS_MODULE.state(), ModuleState::Going);
    assert!(table.lookup(major).is_none());
    assert_eq!(table.proc_devices(), "Character devices:\n");
    assert!(matches!(
        chrdev_open(&table, major, 0, FileMode::READ),
        Err(LinuxError::ENXIO)
    ));
}

#[test]
fn counter_increments_across_sessions() {
    init_logger();
    let table = ChrdevTable::new();
    let module = init_with(&table, leak_module("chardev-cycles"), "").unwrap();
    let major = module.major();

    for n in 0..5 {
        let mut file = chrdev_open(&table, major, 0, FileMode::READ).unwrap();
        let text = String::from_utf8(file.read_to_end().unwrap()).unwrap();
        assert_eq!(text, format!("I already told you {} times Hello world!\n", n));
    }
    assert_eq!(module.device().visits(), 5);
    module.exit(&table);
    assert!(table.is_empty());
}

#[test]
fn chunked_reads_reassemble_message() {
    init_logger();
    let table = ChrdevTable::new();
    let module = init_with(&table, leak_module("chardev-chunks"), "").unwrap();

    for chunk in [1, 5, 13, 40, 64] {
        let mut file = chrdev_open(&table, module.major(), 0, FileMode::READ).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            let n = file.read_len(&mut buf, chunk).unwrap();
            if n == 0 {
                break;
            }
            assert!(n <= chunk);
            out.extend_from_slice(&buf[..n]);
        }
        let expected = format!(
            "I already told you {} times Hello world!\n",
            module.device().visits() - 1
        );
        assert_eq!(out, expected.as_bytes());
    }
    module.exit(&table);
}

#[test]
fn static_major_parameter() {
    init_logger();
    let table = ChrdevTable::new();
    let module = init_with(&table, leak_module("chardev-static"), "major=240").unwrap();
    assert_eq!(module.major(), 240);
    assert_eq!(table.major_of(DEVICE_NAME), Some(240));
    module.exit(&table);
    assert!(table.lookup(240).is_none());
}

struct Placeholder;

impl FileOperations for Placeholder {}

#[test]
fn registration_failure_is_fatal() {
    init_logger();
    let table = ChrdevTable::new();
    table
        .register_chrdev(240, "squatter", Arc::new(Placeholder))
        .unwrap();

    let res = init_with(&table, leak_module("chardev-taken"), "major=240");
    assert!(matches!(res, Err(LinuxError::EBUSY)));
    assert_eq!(table.major_of(DEVICE_NAME), None);

    let res = init_with(&table, leak_module("chardev-huge"), "major=4096");
    assert!(matches!(res, Err(LinuxError::EINVAL)));
}

#[test]
fn bad_parameters_fail_load() {
    init_logger();
    let table = ChrdevTable::new();
    let res = init_with(&table, leak_module("chardev-unknown"), "colour=blue");
    assert!(matches!(res, Err(LinuxError::ENOENT)));
    let res = init_with(&table, leak_module("chardev-garbage"), "major=lots");
    assert!(matches!(res, Err(LinuxError::EINVAL)));
    assert!(table.is_empty());
}

#[test]
fn concurrent_opens_admit_one_session() {
    init_logger();
    let table = Arc::new(ChrdevTable::new());
    let module = init_with(&table, leak_module("chardev-race"), "").unwrap();
    let major = module.major();

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads + 1));
    let (tx, rx) = std::sync::mpsc::channel();
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let table = table.clone();
            let barrier = barrier.clone();
            let tx = tx.clone();
            std::thread::spawn(move || {
                barrier.wait();
                let res = chrdev_open(&table, major, 0, FileMode::READ);
                tx.send(res.is_ok()).unwrap();
                // keep any winning session open until every thread has tried
                barrier.wait();
                drop(res);
            })
        })
        .collect();

    barrier.wait();
    let admitted = (0..threads).filter(|_| rx.recv().unwrap()).count();
    barrier.wait();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(admitted, 1);
    assert_eq!(module.device().visits(), 1);
    assert!(!module.device().is_open());
    module.exit(&*table);
}

#[test]
fn forgotten_session_holds_device() {
    init_logger();
    let table = ChrdevTable::new();
    let owner = leak_module("chardev-forgotten");
    let module = init_with(&table, owner, "").unwrap();

    let file = chrdev_open(&table, module.major(), 0, FileMode::READ).unwrap();
    std::mem::forget(file);
    assert!(module.device().is_open());
    assert!(matches!(
        chrdev_open(&table, module.major(), 0, FileMode::READ),
        Err(LinuxError::EBUSY)
    ));
    assert!(!owner.try_stop());
}
