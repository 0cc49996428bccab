//! Return-slot descriptors.
//!
//! A handler's output is split into up to three slots: an error, a status code and
//! a body. Each slot type declares its role (and for bodies, the renderer family)
//! through [`ReturnSlot`]; whole outputs (`()`, tuples, `Result<R, E>`) through
//! [`Returns`].

use crate::error::{ApiError, JsonError};
use crate::render::{Dynamic, JsonResponse, ResponseBody, ResponseMarshaler};
use crate::typed::{Json, RawBody};
use serde::Serialize;

/// Renderer family bound to a body slot at plan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererKind {
    /// [`JsonResponse`] by value.
    Envelope,
    /// `Option<Box<JsonResponse>>`; `None` renders as no body.
    EnvelopePtr,
    /// Byte payloads written verbatim.
    Bytes,
    /// [`ResponseMarshaler`] implementors.
    Marshaler,
    /// [`Dynamic`], resolved per invocation.
    Dynamic,
    /// Anything serializable, written as JSON.
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Error,
    Status,
    Body(RendererKind),
}

/// Descriptor of one return slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotType {
    name: &'static str,
    kind: SlotKind,
}

impl SlotType {
    #[must_use]
    pub fn error<T>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            kind: SlotKind::Error,
        }
    }

    #[must_use]
    pub fn status<T>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            kind: SlotKind::Status,
        }
    }

    #[must_use]
    pub fn body<T>(renderer: RendererKind) -> Self {
        Self {
            name: std::any::type_name::<T>(),
            kind: SlotKind::Body(renderer),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> SlotKind {
        self.kind
    }
}

/// Runtime value of one return slot.
pub enum SlotValue {
    Error(Option<anyhow::Error>),
    /// Status code as returned; `0` or out of range means unset.
    Status(i64),
    Body(ResponseBody),
    /// Slot not produced, e.g. the success half of an `Err` result.
    Absent,
}

impl std::fmt::Debug for SlotValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotValue::Error(e) => f.debug_tuple("Error").field(e).finish(),
            SlotValue::Status(s) => f.debug_tuple("Status").field(s).finish(),
            SlotValue::Body(_) => f.write_str("Body(..)"),
            SlotValue::Absent => f.write_str("Absent"),
        }
    }
}

/// A type usable as one component of a handler's output.
pub trait ReturnSlot: Send + 'static {
    fn slot_type() -> SlotType;
    fn into_slot(self) -> SlotValue;
}

/// A complete handler output.
pub trait Returns: Send + 'static {
    fn slot_types() -> Vec<SlotType>;
    fn into_slots(self) -> Vec<SlotValue>;
}

impl Returns for () {
    fn slot_types() -> Vec<SlotType> {
        Vec::new()
    }

    fn into_slots(self) -> Vec<SlotValue> {
        Vec::new()
    }
}

macro_rules! tuple_returns {
    ($($ty:ident),+) => {
        impl<$($ty: ReturnSlot),+> Returns for ($($ty,)+) {
            fn slot_types() -> Vec<SlotType> {
                vec![$($ty::slot_type()),+]
            }

            #[allow(non_snake_case)]
            fn into_slots(self) -> Vec<SlotValue> {
                let ($($ty,)+) = self;
                vec![$($ty.into_slot()),+]
            }
        }
    };
}

tuple_returns!(A);
tuple_returns!(A, B);
tuple_returns!(A, B, C);
tuple_returns!(A, B, C, D);
tuple_returns!(A, B, C, D, E);

/// `Result<R, E>` contributes `R`'s slots followed by one error slot.
impl<R, E> Returns for Result<R, E>
where
    R: Returns,
    E: Into<anyhow::Error> + Send + 'static,
{
    fn slot_types() -> Vec<SlotType> {
        let mut slots = R::slot_types();
        slots.push(SlotType::error::<E>());
        slots
    }

    fn into_slots(self) -> Vec<SlotValue> {
        match self {
            Ok(value) => {
                let mut slots = value.into_slots();
                slots.push(SlotValue::Error(None));
                slots
            }
            Err(err) => {
                let mut slots: Vec<SlotValue> =
                    R::slot_types().iter().map(|_| SlotValue::Absent).collect();
                slots.push(SlotValue::Error(Some(err.into())));
                slots
            }
        }
    }
}

macro_rules! single_slot {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Returns for $ty {
                fn slot_types() -> Vec<SlotType> {
                    vec![<$ty as ReturnSlot>::slot_type()]
                }

                fn into_slots(self) -> Vec<SlotValue> {
                    vec![self.into_slot()]
                }
            }
        )*
    };
}

// Error slots

impl ReturnSlot for Option<anyhow::Error> {
    fn slot_type() -> SlotType {
        SlotType::error::<Self>()
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Error(self)
    }
}

impl ReturnSlot for Option<ApiError> {
    fn slot_type() -> SlotType {
        SlotType::error::<Self>()
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Error(self.map(anyhow::Error::new))
    }
}

impl ReturnSlot for Option<JsonError> {
    fn slot_type() -> SlotType {
        SlotType::error::<Self>()
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Error(self.map(anyhow::Error::new))
    }
}

// Status slots

macro_rules! status_slot {
    ($($ty:ty),*) => {
        $(
            impl ReturnSlot for $ty {
                fn slot_type() -> SlotType {
                    SlotType::status::<$ty>()
                }

                fn into_slot(self) -> SlotValue {
                    SlotValue::Status(i64::try_from(self).unwrap_or(-1))
                }
            }
        )*
    };
}

status_slot!(i32, i64, u16, u32, u64, usize);

// Body slots

impl ReturnSlot for JsonResponse {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::Envelope)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::Envelope(self))
    }
}

impl ReturnSlot for Option<Box<JsonResponse>> {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::EnvelopePtr)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::EnvelopePtr(self))
    }
}

impl ReturnSlot for Vec<u8> {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::Bytes)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::Bytes(Some(self)))
    }
}

impl ReturnSlot for Option<Vec<u8>> {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::Bytes)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::Bytes(self))
    }
}

impl ReturnSlot for RawBody {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::Bytes)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::Bytes(Some(self.0)))
    }
}

impl ReturnSlot for Box<dyn ResponseMarshaler> {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::Marshaler)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::Marshaler(Some(self)))
    }
}

impl ReturnSlot for Option<Box<dyn ResponseMarshaler>> {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::Marshaler)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::Marshaler(self))
    }
}

impl ReturnSlot for Dynamic {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::Dynamic)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::Dynamic(self))
    }
}

impl ReturnSlot for serde_json::Value {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::Generic)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::Generic(Some(Box::new(self))))
    }
}

impl ReturnSlot for String {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::Generic)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::Generic(Some(Box::new(self))))
    }
}

impl<T: Serialize + Send + 'static> ReturnSlot for Json<T> {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::Generic)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::Generic(Some(Box::new(self))))
    }
}

impl<T: Serialize + Send + 'static> ReturnSlot for Option<Json<T>> {
    fn slot_type() -> SlotType {
        SlotType::body::<Self>(RendererKind::Generic)
    }

    fn into_slot(self) -> SlotValue {
        SlotValue::Body(ResponseBody::Generic(
            self.map(|v| Box::new(v) as Box<dyn crate::render::SerializeJson>),
        ))
    }
}

impl<T: Serialize + Send + 'static> Returns for Json<T> {
    fn slot_types() -> Vec<SlotType> {
        vec![<Self as ReturnSlot>::slot_type()]
    }

    fn into_slots(self) -> Vec<SlotValue> {
        vec![self.into_slot()]
    }
}

impl<T: Serialize + Send + 'static> Returns for Option<Json<T>> {
    fn slot_types() -> Vec<SlotType> {
        vec![<Self as ReturnSlot>::slot_type()]
    }

    fn into_slots(self) -> Vec<SlotValue> {
        vec![self.into_slot()]
    }
}

single_slot!(
    Option<anyhow::Error>,
    Option<ApiError>,
    Option<JsonError>,
    i32,
    i64,
    u16,
    u32,
    u64,
    usize,
    JsonResponse,
    Option<Box<JsonResponse>>,
    Vec<u8>,
    Option<Vec<u8>>,
    RawBody,
    Box<dyn ResponseMarshaler>,
    Option<Box<dyn ResponseMarshaler>>,
    Dynamic,
    serde_json::Value,
    String,
);
