//! Engine-level round-trip coverage.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Seek, SeekFrom};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::derive::Value;
use crate::plugin::{Container, FilterSet};
use crate::schema::TypeSchema;
use crate::{Error, Format, Session, SessionParams, register_global};

const ALL_FORMATS: [Format; 3] = [Format::Binary, Format::Json, Format::Xml];

fn session(format: Format) -> Session<Cursor<Vec<u8>>> {
    Session::new(Cursor::new(Vec::new()), SessionParams::new(format))
}

fn session_with(params: SessionParams) -> Session<Cursor<Vec<u8>>> {
    Session::new(Cursor::new(Vec::new()), params)
}

fn rewind(session: &mut Session<Cursor<Vec<u8>>>) {
    session.stream_mut().set_position(0);
}

// -----------------------------------------------------------------------------
// Fixtures

#[derive(Value, Default, PartialEq, Debug, Clone)]
#[value(default)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Value, PartialEq, Debug, Clone, Copy)]
enum Color {
    Red = 1,
    Green = 4,
    Blue,
}

#[derive(Value, Default, PartialEq, Debug)]
#[value(default)]
struct Everything {
    flag: bool,
    letter: char,
    count: u16,
    real: f64,
    name: String,
    maybe: Option<i32>,
    missing: Option<i32>,
    list: Vec<u16>,
    triple: [i32; 3],
    nested: Point,
}

fn everything() -> Everything {
    Everything {
        flag: true,
        letter: 'λ',
        count: 65535,
        real: -2.5,
        name: String::from("véhicule <&> \"quoted\""),
        maybe: Some(-1),
        missing: None,
        list: vec![1, 2, 3],
        triple: [-1, 0, 1],
        nested: Point { x: 7, y: -7 },
    }
}

// -----------------------------------------------------------------------------
// Round trips

#[test]
fn round_trip_composite_struct_in_every_format() {
    for format in ALL_FORMATS {
        let mut session = session(format);
        session.serialize(&everything()).unwrap();
        rewind(&mut session);
        let decoded: Everything = session.deserialize_as().unwrap();
        assert_eq!(decoded, everything(), "{format:?}");
    }
}

#[test]
fn round_trip_boundary_integers_bit_exact() {
    #[derive(Value, Default, PartialEq, Debug)]
    #[value(default)]
    struct Extremes {
        a: i8,
        b: i16,
        c: i32,
        d: i64,
        e: i128,
        f: isize,
        g: u8,
        h: u16,
        i: u32,
        j: u64,
        k: u128,
        l: usize,
    }

    let extremes = Extremes {
        a: i8::MIN,
        b: i16::MIN,
        c: i32::MIN,
        d: i64::MIN,
        e: i128::MIN,
        f: isize::MIN,
        g: u8::MAX,
        h: u16::MAX,
        i: u32::MAX,
        j: u64::MAX,
        k: u128::MAX,
        l: usize::MAX,
    };

    for format in ALL_FORMATS {
        let mut session = session(format);
        session.serialize(&extremes).unwrap();
        rewind(&mut session);
        let decoded: Extremes = session.deserialize_as().unwrap();
        assert_eq!(decoded, extremes, "{format:?}");
    }
}

#[test]
fn round_trip_enum_variants() {
    let colors = vec![Color::Red, Color::Green, Color::Blue];
    for format in ALL_FORMATS {
        let mut session = session(format);
        session.serialize(&colors).unwrap();
        rewind(&mut session);
        let decoded: Vec<Color> = session.deserialize_as().unwrap();
        assert_eq!(decoded, colors, "{format:?}");
    }
}

#[test]
fn round_trip_mapping() {
    let mut mapping = HashMap::new();
    mapping.insert(123_i32, String::from("hello"));
    mapping.insert(456_i32, String::from("world"));

    for format in ALL_FORMATS {
        let mut session = session(format);
        session.serialize(&mapping).unwrap();
        rewind(&mut session);
        let decoded: HashMap<i32, String> = session.deserialize_as().unwrap();
        assert_eq!(decoded, mapping, "{format:?}");
    }
}

#[test]
fn null_and_empty_string_stay_distinct() {
    let values: Vec<Option<String>> = vec![None, Some(String::new())];
    for format in ALL_FORMATS {
        let mut session = session(format);
        session.serialize(&values).unwrap();
        rewind(&mut session);
        let decoded: Vec<Option<String>> = session.deserialize_as().unwrap();
        assert_eq!(decoded[0], None, "{format:?}");
        assert_eq!(decoded[1], Some(String::new()), "{format:?}");
        assert_ne!(decoded[0], decoded[1], "{format:?}");
    }
}

#[derive(Value, Default, PartialEq, Debug)]
#[value(default, auto_register)]
struct AutoRegistered {
    n: i32,
}

#[cfg(feature = "auto_register")]
#[test]
fn auto_registered_types_resolve_without_manual_registration() {
    let mut session = session(Format::Json);
    session.serialize(&AutoRegistered { n: 5 }).unwrap();
    rewind(&mut session);
    let decoded = session.deserialize().unwrap();
    assert_eq!(
        decoded.take::<AutoRegistered>().unwrap(),
        AutoRegistered { n: 5 }
    );
}

#[test]
fn dynamic_root_resolves_through_the_registry() {
    register_global::<Everything>();

    let mut session = session(Format::Binary);
    session.serialize(&everything()).unwrap();
    rewind(&mut session);
    let decoded = session.deserialize().unwrap();
    assert_eq!(decoded.take::<Everything>().unwrap(), everything());
}

// -----------------------------------------------------------------------------
// Reference identity and cycles

#[derive(Value, Default, Debug)]
#[value(default)]
struct SharedPair {
    first: Arc<String>,
    second: Arc<String>,
    other: Arc<String>,
}

#[test]
fn shared_instances_keep_their_identity() {
    let shared = Arc::new(String::from("shared"));
    let pair = SharedPair {
        first: Arc::clone(&shared),
        second: Arc::clone(&shared),
        other: Arc::new(String::from("shared")),
    };

    for format in ALL_FORMATS {
        let mut session = session(format);
        session.serialize(&pair).unwrap();
        rewind(&mut session);
        let decoded: SharedPair = session.deserialize_as().unwrap();

        assert!(Arc::ptr_eq(&decoded.first, &decoded.second), "{format:?}");
        assert!(!Arc::ptr_eq(&decoded.first, &decoded.other), "{format:?}");
        assert_eq!(*decoded.first, "shared", "{format:?}");
        assert_eq!(*decoded.other, "shared", "{format:?}");
    }
}

#[derive(Value, Debug)]
#[value(placeholder)]
struct Node {
    id: i32,
    next: Option<Rc<RefCell<Node>>>,
}

#[test]
fn self_referencing_node_round_trips() {
    for format in ALL_FORMATS {
        let node = Rc::new(RefCell::new(Node { id: 1, next: None }));
        node.borrow_mut().next = Some(Rc::clone(&node));

        let mut session = session(format);
        session.serialize(&node).unwrap();
        rewind(&mut session);
        let decoded: Rc<RefCell<Node>> = session.deserialize_as().unwrap();

        assert_eq!(decoded.borrow().id, 1, "{format:?}");
        let next = decoded.borrow().next.clone().unwrap();
        assert!(Rc::ptr_eq(&decoded, &next), "{format:?}");

        // Break the cycles so the test does not leak.
        node.borrow_mut().next = None;
        decoded.borrow_mut().next = None;
    }
}

#[test]
fn mutually_referencing_nodes_round_trip() {
    for format in ALL_FORMATS {
        let a = Rc::new(RefCell::new(Node { id: 1, next: None }));
        let b = Rc::new(RefCell::new(Node { id: 2, next: None }));
        a.borrow_mut().next = Some(Rc::clone(&b));
        b.borrow_mut().next = Some(Rc::clone(&a));

        let mut session = session(format);
        session.serialize(&a).unwrap();
        rewind(&mut session);
        let decoded_a: Rc<RefCell<Node>> = session.deserialize_as().unwrap();

        let decoded_b = decoded_a.borrow().next.clone().unwrap();
        assert_eq!(decoded_a.borrow().id, 1, "{format:?}");
        assert_eq!(decoded_b.borrow().id, 2, "{format:?}");
        let back = decoded_b.borrow().next.clone().unwrap();
        assert!(Rc::ptr_eq(&decoded_a, &back), "{format:?}");

        a.borrow_mut().next = None;
        b.borrow_mut().next = None;
        decoded_a.borrow_mut().next = None;
        decoded_b.borrow_mut().next = None;
    }
}

#[test]
fn shared_reference_table_spans_sequential_calls() {
    let shared = Arc::new(String::from("persistent"));

    let params = SessionParams::new(Format::Binary).share_reference_table(true);
    let mut session = session_with(params);
    session.serialize(&shared).unwrap();
    session.serialize(&shared).unwrap();

    rewind(&mut session);
    let first: Arc<String> = session.deserialize_as().unwrap();
    let second: Arc<String> = session.deserialize_as().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

// -----------------------------------------------------------------------------
// Constructors

#[derive(Value, PartialEq, Debug)]
#[value(ctor = "new(id, label)")]
struct Entry {
    id: u32,
    label: String,
}

impl Entry {
    fn new(id: u32, label: String) -> Self {
        Self { id, label }
    }
}

#[test]
fn type_without_default_constructs_parametrically() {
    let entry = Entry::new(9, String::from("nine"));
    for format in ALL_FORMATS {
        let mut session = session(format);
        session.serialize(&entry).unwrap();
        rewind(&mut session);
        let decoded: Entry = session.deserialize_as().unwrap();
        assert_eq!(decoded, entry, "{format:?}");
    }
}

#[derive(Value, Default, PartialEq, Debug)]
#[value(default, ctor = "rebuild(total)")]
struct Tally {
    total: i64,
    #[value(skip)]
    rebuilt: bool,
}

impl Tally {
    fn rebuild(total: i64) -> Self {
        Self {
            total,
            rebuilt: true,
        }
    }
}

#[test]
fn forced_parametric_overrides_the_default_allocator() {
    let tally = Tally {
        total: 5,
        rebuilt: false,
    };

    let mut plain = session(Format::Binary);
    plain.serialize(&tally).unwrap();
    rewind(&mut plain);
    let decoded: Tally = plain.deserialize_as().unwrap();
    assert!(!decoded.rebuilt);

    let params = SessionParams::new(Format::Binary).with_forced_parametric::<Tally>();
    let mut forced = session_with(params);
    forced.serialize(&tally).unwrap();
    rewind(&mut forced);
    let decoded: Tally = forced.deserialize_as().unwrap();
    assert!(decoded.rebuilt);
    assert_eq!(decoded.total, 5);
}

// -----------------------------------------------------------------------------
// Containers

// No allocator, no constructor: only a container can move this type.
#[derive(Value, PartialEq, Debug)]
struct Sealed {
    inner: i32,
}

struct SealedContainer {
    packs: Arc<AtomicUsize>,
    unpacks: Arc<AtomicUsize>,
}

impl Container for SealedContainer {
    fn applies_to(&self, schema: &'static TypeSchema) -> bool {
        schema.id() == core::any::TypeId::of::<Sealed>()
    }

    fn pack(&self, value: &dyn crate::Value) -> Result<Box<dyn crate::Value>, Box<dyn core::error::Error>> {
        self.packs.fetch_add(1, Ordering::Relaxed);
        let sealed = value
            .downcast_ref::<Sealed>()
            .ok_or_else(|| Box::<dyn core::error::Error>::from("not a Sealed value"))?;
        Ok(Box::new(sealed.inner))
    }

    fn unpack(
        &self,
        surrogate: Box<dyn crate::Value>,
    ) -> Result<Box<dyn crate::Value>, Box<dyn core::error::Error>> {
        self.unpacks.fetch_add(1, Ordering::Relaxed);
        let inner = surrogate
            .take::<i32>()
            .map_err(|_| Box::<dyn core::error::Error>::from("surrogate is not an i32"))?;
        Ok(Box::new(Sealed { inner }))
    }
}

#[test]
fn container_supplies_the_surrogate_representation() {
    let packs = Arc::new(AtomicUsize::new(0));
    let unpacks = Arc::new(AtomicUsize::new(0));

    let params = SessionParams::new(Format::Binary).with_container(Box::new(SealedContainer {
        packs: Arc::clone(&packs),
        unpacks: Arc::clone(&unpacks),
    }));
    let mut session = session_with(params);

    session.serialize(&Sealed { inner: 77 }).unwrap();
    rewind(&mut session);
    let decoded: Sealed = session.deserialize_as().unwrap();

    assert_eq!(decoded, Sealed { inner: 77 });
    assert_eq!(packs.load(Ordering::Relaxed), 1);
    assert_eq!(unpacks.load(Ordering::Relaxed), 1);
}

#[test]
fn unclaimed_sealed_type_is_not_serializable() {
    let mut session = session(Format::Binary);
    match session.serialize(&Sealed { inner: 1 }) {
        Err(Error::TypeNotSerializable { type_path, .. }) => {
            assert!(type_path.contains("Sealed"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

// -----------------------------------------------------------------------------
// Filters

#[derive(Value, Default, PartialEq, Debug)]
#[value(default)]
struct WithSecret {
    visible: i32,
    #[value(skip)]
    secret: i32,
}

struct IncludeSecret;

impl FilterSet for IncludeSecret {
    fn additional_members(&self, schema: &'static TypeSchema) -> Option<Vec<&'static str>> {
        (schema.id() == core::any::TypeId::of::<WithSecret>()).then(|| vec!["secret"])
    }
}

#[test]
fn skipped_members_do_not_participate_by_default() {
    let value = WithSecret {
        visible: 1,
        secret: 2,
    };
    let mut session = session(Format::Binary);
    session.serialize(&value).unwrap();
    rewind(&mut session);
    let decoded: WithSecret = session.deserialize_as().unwrap();
    assert_eq!(decoded.visible, 1);
    assert_eq!(decoded.secret, 0);
}

#[test]
fn filters_can_force_include_skipped_members() {
    let value = WithSecret {
        visible: 1,
        secret: 2,
    };
    let params = SessionParams::new(Format::Binary).with_filter(Box::new(IncludeSecret));
    let mut session = session_with(params);
    session.serialize(&value).unwrap();
    rewind(&mut session);
    let decoded: WithSecret = session.deserialize_as().unwrap();
    assert_eq!(decoded.secret, 2);
}

struct VetoPoints;

impl FilterSet for VetoPoints {
    fn is_type_serializable(&self, schema: &'static TypeSchema) -> bool {
        schema.id() != core::any::TypeId::of::<Point>()
    }
}

#[test]
fn filters_can_veto_a_type() {
    let params = SessionParams::new(Format::Binary).with_filter(Box::new(VetoPoints));
    let mut session = session_with(params);
    match session.serialize(&Point { x: 1, y: 2 }) {
        Err(Error::TypeNotSerializable { .. }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

struct StampSecret;

impl FilterSet for StampSecret {
    fn post_allocate(&self, value: &mut dyn crate::Value) -> bool {
        if let Some(with_secret) = value.downcast_mut::<WithSecret>() {
            with_secret.secret = 42;
            true
        } else {
            false
        }
    }
}

#[test]
fn post_allocate_hook_runs_before_population() {
    let value = WithSecret {
        visible: 7,
        secret: 0,
    };
    let params = SessionParams::new(Format::Binary).with_filter(Box::new(StampSecret));
    let mut session = session_with(params);
    session.serialize(&value).unwrap();
    rewind(&mut session);
    let decoded: WithSecret = session.deserialize_as().unwrap();

    // `visible` is overwritten by population; the skipped member keeps the
    // hook's stamp.
    assert_eq!(decoded.visible, 7);
    assert_eq!(decoded.secret, 42);
}

// -----------------------------------------------------------------------------
// Best-effort mode

#[derive(Value, Default, PartialEq, Debug)]
#[value(default)]
struct MostlyFine {
    keep: i32,
    bad: Point,
}

#[test]
fn lenient_calls_substitute_and_report() {
    register_global::<MostlyFine>();

    let params = SessionParams::new(Format::Binary).with_filter(Box::new(VetoPoints));
    let mut session = session_with(params);

    let failures = session
        .serialize_lenient(&MostlyFine {
            keep: 3,
            bad: Point { x: 1, y: 1 },
        })
        .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, "bad");

    rewind(&mut session);
    let lenient = session.deserialize_lenient().unwrap();
    assert_eq!(lenient.failures.len(), 1);
    assert_eq!(lenient.failures[0].path, "bad");

    let decoded = lenient.value.take::<MostlyFine>().unwrap();
    assert_eq!(decoded.keep, 3);
    assert_eq!(decoded.bad, Point::default());
}

// -----------------------------------------------------------------------------
// Sequential reuse

#[test]
fn sequential_serialize_then_deserialize_on_one_stream() {
    let mut session = session(Format::Binary);
    for value in 1..=10_i32 {
        let start = session.stream_mut().position();
        session.serialize(&value).unwrap();
        session.stream_mut().set_position(start);
        let decoded: i32 = session.deserialize_as().unwrap();
        assert_eq!(decoded, value);
    }
}

#[test]
fn file_backed_streams_work() {
    let file = tempfile::tempfile().unwrap();
    let mut session = Session::new(file, SessionParams::new(Format::Binary));
    session.serialize(&everything()).unwrap();

    session.stream_mut().seek(SeekFrom::Start(0)).unwrap();
    let decoded: Everything = session.deserialize_as().unwrap();
    assert_eq!(decoded, everything());
}

// -----------------------------------------------------------------------------
// Failure modes

#[test]
fn doctored_version_fails_with_version_mismatch() {
    let mut session = session(Format::Binary);
    session.serialize(&1_i32).unwrap();

    let mut bytes = session.into_stream().into_inner();
    bytes[4] = 9;
    let mut session = Session::new(Cursor::new(bytes), SessionParams::new(Format::Binary));
    match session.deserialize_as::<i32>() {
        Err(Error::VersionMismatch { found: 9, .. }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn unknown_type_tag_fails_decoding() {
    #[derive(Value, Default, PartialEq, Debug)]
    #[value(default)]
    struct NeverRegistered {
        n: i32,
    }

    let mut session = session(Format::Binary);
    session
        .serialize(&NeverRegistered { n: 1 })
        .unwrap();
    rewind(&mut session);
    match session.deserialize() {
        Err(Error::Format { detail, .. }) => assert!(detail.contains("unknown type tag")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn back_reference_to_unregistered_id_fails() {
    let mut bytes = Vec::new();
    {
        use crate::fmt::FormatWriter;
        let mut writer = crate::fmt::BinaryWriter::new(&mut bytes);
        writer.write_header().unwrap();
        writer.write_back_ref(5).unwrap();
        writer.finish().unwrap();
    }

    let mut session = Session::new(Cursor::new(bytes), SessionParams::new(Format::Binary));
    match session.deserialize() {
        Err(Error::Format { detail, .. }) => assert!(detail.contains("unregistered")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn truncated_stream_fails_with_a_format_error() {
    let mut session = session(Format::Binary);
    session.serialize(&everything()).unwrap();

    let mut bytes = session.into_stream().into_inner();
    bytes.truncate(bytes.len() / 2);
    let mut session = Session::new(Cursor::new(bytes), SessionParams::new(Format::Binary));
    match session.deserialize_as::<Everything>() {
        Err(Error::Format { .. }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn decode_errors_carry_member_context() {
    let mut session = session(Format::Binary);
    session.serialize(&everything()).unwrap();

    let mut bytes = session.into_stream().into_inner();
    // Chop inside the member list, past the first few members.
    bytes.truncate(bytes.len() - 6);
    let mut session = Session::new(Cursor::new(bytes), SessionParams::new(Format::Binary));
    match session.deserialize_as::<Everything>() {
        Err(Error::Format { at, .. }) => assert!(!at.is_empty()),
        other => panic!("unexpected result: {other:?}"),
    }
}
