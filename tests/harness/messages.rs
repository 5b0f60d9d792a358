#![allow(dead_code)]

use msgsock::*;

record! {
    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct Vector3 {
        pub x: f32,
        pub y: f32,
        pub z: f32,
    }
}

record! {
    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct Nested {
        pub label: Option<String>,
        pub origin: Vector3,
        pub path: Vec<Vector3>,
    }
}

message! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Hello [id = 0, visibility = Visibility::Internal] {
        pub id: u64,
        pub author: String,
        pub body: String,
    }
}

message! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Data [visibility = Visibility::Internal] {
        pub index: u64,
        pub x: f32,
        pub y: f32,
        pub z: f32,
        pub doubles: Option<Vec<f64>>,
        pub small: i8,
        pub letter: char,
        pub strings: Option<Vec<Option<String>>>,
    }
}

message! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct DataStruct [id = 2, visibility = Visibility::Internal] {
        pub data: Data,
        pub data_array: Option<Vec<Data>>,
        pub vector: Vector3,
        pub vectors: Option<Vec<Vector3>>,
        pub nested: Nested,
    }
}

message! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Scalars [visibility = Visibility::Internal] {
        pub a: u8,
        pub b: i8,
        pub c: bool,
        pub d: i16,
        pub e: u16,
        pub f: char,
        pub g: i32,
        pub h: u32,
        pub i: f32,
        pub j: i64,
        pub k: u64,
        pub l: f64,
    }
}

// Public: an internal-only registry leaves it out.
message! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct AppPing {
        pub seq: u32,
    }
}

pub fn registry() -> Registry {
    Registry::builder()
        .visibility(VisibilityFilter::InternalOnly)
        .register::<Hello>()
        .register::<Data>()
        .register::<DataStruct>()
        .register::<Scalars>()
        .register::<AppPing>()
        .build()
        .expect("test registry builds")
}

pub fn hello(i: u64) -> Hello {
    Hello {
        id: i,
        author: format!("Client{i}"),
        body: format!("Hello! {i}"),
    }
}

pub fn data(i: u64) -> Data {
    Data {
        index: i,
        x: 1.5,
        y: -2.25,
        z: i as f32,
        doubles: Some((0..i).map(|n| n as f64 * 0.5).collect()),
        small: -7,
        letter: 'é',
        strings: Some(vec![Some("alpha".into()), None, Some(String::new())]),
    }
}

pub fn data_struct(i: u64) -> DataStruct {
    DataStruct {
        data: data(i),
        data_array: Some(vec![data(1), data(2)]),
        vector: Vector3 { x: 1.0, y: 2.0, z: 3.0 },
        vectors: None,
        nested: Nested {
            label: Some("deep".into()),
            origin: Vector3::default(),
            path: vec![Vector3 { x: 0.5, y: 0.5, z: 0.5 }; 3],
        },
    }
}
