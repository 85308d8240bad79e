//! Tests for the GDB adapter against the scripted engine

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::FakeGdb;
use vantage_core::backend::gdb::{Connection, NativeFrame, NativeThread};
use vantage_core::dbg::{CommandHandler, Debugger, EventType, HistoryEntry, TypeCode};
use vantage_core::error::DebuggerError;
use vantage_core::types::{Address, Ptid};

#[test]
fn test_setup_runs_once()
{
    let fake = FakeGdb::x86_64();
    let gdb = fake.debugger();

    gdb.setup().unwrap();
    let first = fake.executed();
    gdb.setup().unwrap();

    assert!(gdb.is_setup());
    assert_eq!(fake.executed(), first);
    assert!(first.contains(&"set confirm off".to_string()));
    assert!(first.contains(&"set pagination off".to_string()));
    assert!(first.contains(&"handle SIGALRM nostop print nopass".to_string()));
    assert!(first.contains(&"handle SIGSEGV stop print nopass".to_string()));
    assert!(first.contains(&"set disassembly-flavor intel".to_string()));
    assert!(first.iter().any(|command| command.starts_with("set width ")));
    assert!(!first.contains(&"set remote search-memory-packet off".to_string()));
}

#[test]
fn test_setup_on_old_gdb()
{
    let fake = FakeGdb::x86_64();
    fake.set_version(9, 2);
    fake.debugger().setup().unwrap();

    assert!(fake
        .executed()
        .contains(&"set remote search-memory-packet off".to_string()));
}

#[test]
fn test_setup_tolerates_missing_disassembler()
{
    let fake = FakeGdb::x86_64();
    fake.fail_command("set disassembly-flavor");

    assert!(fake.debugger().setup().is_ok());
}

#[test]
fn test_setup_propagates_other_failures()
{
    let fake = FakeGdb::x86_64();
    fake.fail_command("set confirm");

    assert!(matches!(fake.debugger().setup(), Err(DebuggerError::Engine(_))));
}

#[test]
fn test_frame_evaluation_restores_selection()
{
    let fake = FakeGdb::x86_64();
    let outer = fake.add_frame(NativeThread(1));
    fake.set_register(outer, "rax", 0x42);
    let gdb = fake.debugger();

    fake.select(NativeThread(1), outer);
    let frame = gdb.session().selected_frame().unwrap();
    fake.select(NativeThread(1), NativeFrame(0));

    let value = frame.evaluate_expression("$rax").unwrap();
    assert_eq!(value.to_int().unwrap(), 0x42);
    assert_eq!(fake.selected(), (Some(NativeThread(1)), Some(NativeFrame(0))));

    assert!(frame.evaluate_expression("$nosuch").is_err());
    assert_eq!(fake.selected(), (Some(NativeThread(1)), Some(NativeFrame(0))));
    assert_eq!(frame.level().unwrap(), 1);
}

#[test]
fn test_bottom_frame_restores_thread()
{
    let fake = FakeGdb::x86_64();
    let (_, frame) = fake.add_thread(Ptid::new(4242, 4243, 0));
    fake.set_register(frame, "rax", 7);
    let gdb = fake.debugger();

    let threads = gdb.inferior().unwrap().threads().unwrap();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[1].ptid(), Some(Ptid::new(4242, 4243, 0)));

    let bottom = threads[1].bottom_frame().unwrap();
    let rax = bottom.read_register("rax").unwrap().unwrap();
    assert_eq!(rax.to_int().unwrap(), 7);
    assert_eq!(fake.selected(), (Some(NativeThread(1)), Some(NativeFrame(0))));
}

#[test]
fn test_bottom_frame_keeps_outer_frame_selected()
{
    let fake = FakeGdb::x86_64();
    let outer = fake.add_frame(NativeThread(1));
    fake.set_register(outer, "rax", 0x11);
    let (_, frame) = fake.add_thread(Ptid::new(4242, 4243, 0));
    fake.set_register(frame, "rax", 0x22);
    let gdb = fake.debugger();

    fake.select(NativeThread(1), outer);
    let threads = gdb.inferior().unwrap().threads().unwrap();
    let bottom = threads[1].bottom_frame().unwrap();

    assert_eq!(fake.selected(), (Some(NativeThread(1)), Some(outer)));
    assert_eq!(bottom.read_register("rax").unwrap().unwrap().to_int().unwrap(), 0x22);
    assert_eq!(fake.selected(), (Some(NativeThread(1)), Some(outer)));
    assert_eq!(
        gdb.session()
            .selected_frame()
            .unwrap()
            .read_register("rax")
            .unwrap()
            .unwrap()
            .to_int()
            .unwrap(),
        0x11
    );
}

#[test]
fn test_no_switch_when_already_selected()
{
    let fake = FakeGdb::x86_64();
    let gdb = fake.debugger();

    let threads = gdb.inferior().unwrap().threads().unwrap();
    threads[0].bottom_frame().unwrap();
    gdb.session()
        .selected_frame()
        .unwrap()
        .evaluate_expression("1")
        .unwrap();

    assert_eq!(fake.selection_changes(), 0);
}

#[test]
fn test_missing_inferior()
{
    let fake = FakeGdb::x86_64();
    fake.remove_inferior();
    let gdb = fake.debugger();

    assert!(matches!(gdb.inferior(), Err(DebuggerError::NoProcess)));
    assert_eq!(gdb.addrsz(0x401000), "0x0000000000401000");
}

#[test]
fn test_addrsz_follows_pointer_width()
{
    assert_eq!(FakeGdb::x86_64().debugger().addrsz(0x401000), "0x0000000000401000");
    assert_eq!(FakeGdb::i386().debugger().addrsz(0x8048000), "0x08048000");
}

#[test]
fn test_cmd_window_size()
{
    let fake = FakeGdb::x86_64();
    let gdb = fake.debugger();
    assert_eq!(gdb.get_cmd_window_size(), (None, None));

    fake.set_info_win(Some("Name       Lines Columns Focus\nsrc           77     104 (has focus)\ncmd           77     105\n"));
    assert_eq!(gdb.get_cmd_window_size(), (Some(77), Some(105)));
}

#[test]
fn test_set_diagnostics()
{
    let fake = FakeGdb::x86_64();
    let gdb = fake.debugger();

    gdb.set_diagnostics(true).unwrap();
    gdb.set_diagnostics(false).unwrap();

    let executed = fake.executed();
    assert_eq!(executed[executed.len() - 2], "set python print-stack full");
    assert_eq!(executed[executed.len() - 1], "set python print-stack message");
}

#[test]
fn test_global_evaluation()
{
    let fake = FakeGdb::x86_64();
    let gdb = fake.debugger();

    assert_eq!(gdb.evaluate_expression("0x10").unwrap().to_int().unwrap(), 16);
    assert!(gdb.evaluate_expression("no_such_symbol").is_err());
}

#[test]
fn test_add_command()
{
    let fake = FakeGdb::x86_64();
    let gdb = fake.debugger();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let log = seen.clone();
    let handler: CommandHandler = Rc::new(move |debugger: &dyn Debugger, arguments: &str, from_tty: bool| {
        log.borrow_mut().push((debugger.addrsz(0x10), arguments.to_string(), from_tty));
        Ok(())
    });
    let handle = gdb.add_command("hello", handler).unwrap();

    fake.invoke("hello", "a b").unwrap();
    assert_eq!(seen.borrow().as_slice(), [("0x0000000000000010".to_string(), "a b".to_string(), true)]);

    handle.remove();
    drop(gdb);
    assert!(matches!(fake.invoke("hello", ""), Err(DebuggerError::StaleHandle(_))));
}

#[test]
fn test_command_errors_propagate()
{
    let fake = FakeGdb::x86_64();
    let gdb = fake.debugger();
    let handler: CommandHandler =
        Rc::new(|_: &dyn Debugger, arguments: &str, _: bool| Err(DebuggerError::InvalidArgument(arguments.to_string())));
    gdb.add_command("broken", handler).unwrap();

    assert!(matches!(
        fake.invoke("broken", "x"),
        Err(DebuggerError::InvalidArgument(argument)) if argument == "x"
    ));
}

#[test]
fn test_session_history_and_args()
{
    let fake = FakeGdb::x86_64();
    let session = fake.debugger().session();

    let history = session.history().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(
        history[1],
        HistoryEntry {
            index: 2,
            command: "break main".to_string()
        }
    );
    assert_eq!(session.lex_args("x/4gx $sp").unwrap(), ["x/4gx", "$sp"]);
}

#[test]
fn test_event_handlers()
{
    let fake = FakeGdb::x86_64();
    let gdb = fake.debugger();
    let stops = Rc::new(RefCell::new(0));

    let counter = stops.clone();
    let id = gdb.register_event_handler(&[EventType::Stop], Rc::new(move |_| *counter.borrow_mut() += 1));

    gdb.notify(EventType::Stop);
    gdb.notify(EventType::Continue);
    assert_eq!(*stops.borrow(), 1);

    assert!(gdb.remove_event_handler(id));
    assert!(!gdb.remove_event_handler(id));
    gdb.notify(EventType::Stop);
    assert_eq!(*stops.borrow(), 1);
}

#[test]
fn test_types()
{
    let fake = FakeGdb::x86_64();
    let inferior = fake.debugger().inferior().unwrap();

    let uint = inferior.lookup_type("unsigned int").unwrap();
    assert_eq!(uint.name().as_deref(), Some("unsigned int"));
    assert_eq!(uint.sizeof(), 4);
    assert_eq!(uint.code(), TypeCode::Int);

    let pointer = uint.pointer().unwrap();
    assert_eq!(pointer.code(), TypeCode::Pointer);
    assert_eq!(pointer.sizeof(), 8);
    assert_eq!(pointer.target().unwrap().sizeof(), 4);

    let array = uint.array(4).unwrap();
    assert_eq!(array.code(), TypeCode::Array);
    assert_eq!(array.sizeof(), 16);
    assert!(matches!(uint.array(0), Err(DebuggerError::InvalidArgument(_))));

    assert!(matches!(
        inferior.lookup_type("struct nope"),
        Err(DebuggerError::TypeNotFound(_))
    ));
}

#[test]
fn test_connection_kinds()
{
    let fake = FakeGdb::x86_64();
    let gdb = fake.debugger();
    assert!(!gdb.inferior().unwrap().is_remote());

    fake.set_connection(Connection::QemuSystem);
    fake.set_monitor_output("ok\n");
    let inferior = gdb.inferior().unwrap();
    assert!(inferior.is_remote());
    assert!(inferior.is_qemu_kernel());
    assert_eq!(inferior.send_monitor("info mtree").unwrap(), "ok\n");
    assert!(fake.executed().contains(&"monitor info mtree".to_string()));
}

#[test]
fn test_vmmap_merges_adjacent_pages()
{
    let fake = FakeGdb::x86_64();
    fake.map(0x400000, 2, false);
    fake.map(0x402000, 1, true);
    let pages = fake.debugger().inferior().unwrap().vmmap().unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].start, Address::new(0x400000));
    assert_eq!(pages[0].size(), 0x2000);
    assert_eq!(pages[1].permissions.to_string(), "rw-");
}

#[test]
fn test_partial_write_stops_at_read_only_page()
{
    let fake = FakeGdb::x86_64();
    fake.map(0x600000, 1, true);
    fake.map(0x601000, 1, false);
    let inferior = fake.debugger().inferior().unwrap();

    inferior.write_memory(0x600ffe, &[1, 2, 3, 4], true).unwrap();
    assert_eq!(inferior.read_memory(0x600ffe, 4, false).unwrap(), [1, 2, 0, 0]);
    assert!(inferior.write_memory(0x600ffe, &[1, 2, 3, 4], false).is_err());
}

#[test]
fn test_unknown_architecture()
{
    let fake = FakeGdb::new("vax", 4, vantage_core::arch::Endian::Little);

    assert!(matches!(
        fake.debugger().inferior().unwrap().arch(),
        Err(DebuggerError::UnknownArchitecture(name)) if name == "vax"
    ));
}
