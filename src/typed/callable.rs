//! Adapting plain functions of arity 0..=12 into type-erased handler functions.

use crate::error::ApiError;
use crate::typed::{Arg, ArgType, ArgValue, Returns, SlotType, SlotValue};
use std::marker::PhantomData;
use std::sync::Arc;

/// Implemented for every `Fn` whose parameters implement [`Arg`] and whose output
/// implements [`Returns`].
///
/// ```
/// use brrtbind::typed::HandlerFn;
///
/// fn takes<Func, Args>(_f: Func)
/// where
///     Func: HandlerFn<Args>,
/// {
/// }
///
/// fn no_args() {}
/// fn two_args(a: String, b: String) -> Vec<u8> {
///     format!("{a}{b}").into_bytes()
/// }
///
/// takes(no_args);
/// takes(two_args);
/// takes(|id: String| -> i32 { id.len() as i32 });
/// ```
pub trait HandlerFn<Args>: Clone + Send + Sync + 'static {
    type Output: Returns;

    /// Descriptors of the declared parameters, in order.
    fn arg_types() -> Vec<ArgType>;

    /// Invoke with one produced value per declared parameter.
    fn call(&self, args: Vec<ArgValue>) -> Result<Self::Output, ApiError>;
}

macro_rules! impl_handler_fn {
    ($($var:ident),*) => {
        impl<FunctionType, OutputType, $($var,)*> HandlerFn<($($var,)*)> for FunctionType
        where
            FunctionType: Fn($($var),*) -> OutputType + Clone + Send + Sync + 'static,
            OutputType: Returns,
            $($var: Arg,)*
        {
            type Output = OutputType;

            fn arg_types() -> Vec<ArgType> {
                vec![$(<$var as Arg>::arg_type()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, args: Vec<ArgValue>) -> Result<OutputType, ApiError> {
                let mut args = args.into_iter();
                $(
                    let $var = <$var as Arg>::from_arg_value(
                        args.next().ok_or_else(|| ApiError::internal("missing handler argument"))?,
                    )?;
                )*
                Ok((self)($($var),*))
            }
        }
    };
}

impl_handler_fn!();
impl_handler_fn!(A);
impl_handler_fn!(A, B);
impl_handler_fn!(A, B, C);
impl_handler_fn!(A, B, C, D);
impl_handler_fn!(A, B, C, D, E);
impl_handler_fn!(A, B, C, D, E, F);
impl_handler_fn!(A, B, C, D, E, F, G);
impl_handler_fn!(A, B, C, D, E, F, G, H);
impl_handler_fn!(A, B, C, D, E, F, G, H, I);
impl_handler_fn!(A, B, C, D, E, F, G, H, I, J);
impl_handler_fn!(A, B, C, D, E, F, G, H, I, J, K);
impl_handler_fn!(A, B, C, D, E, F, G, H, I, J, K, L);

/// Object-safe view of a [`HandlerFn`].
pub(crate) trait ErasedHandler: Send + Sync {
    fn arg_types(&self) -> Vec<ArgType>;
    fn slot_types(&self) -> Vec<SlotType>;
    fn invoke(&self, args: Vec<ArgValue>) -> Result<Vec<SlotValue>, ApiError>;
    fn type_name(&self) -> &'static str;
}

struct FnAdapter<Func, Args> {
    func: Func,
    _args: PhantomData<fn() -> Args>,
}

impl<Func, Args> ErasedHandler for FnAdapter<Func, Args>
where
    Func: HandlerFn<Args>,
    Args: 'static,
{
    fn arg_types(&self) -> Vec<ArgType> {
        Func::arg_types()
    }

    fn slot_types(&self) -> Vec<SlotType> {
        <Func::Output as Returns>::slot_types()
    }

    fn invoke(&self, args: Vec<ArgValue>) -> Result<Vec<SlotValue>, ApiError> {
        Ok(self.func.call(args)?.into_slots())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Func>()
    }
}

/// A handler function with its signature erased, ready for planning.
#[derive(Clone)]
pub struct BoxedHandlerFn(pub(crate) Arc<dyn ErasedHandler>);

impl BoxedHandlerFn {
    pub fn new<Func, Args>(func: Func) -> Self
    where
        Func: HandlerFn<Args>,
        Args: 'static,
    {
        Self(Arc::new(FnAdapter {
            func,
            _args: PhantomData,
        }))
    }

    /// Rust type name of the wrapped function, used in logs.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    #[must_use]
    pub fn arg_types(&self) -> Vec<ArgType> {
        self.0.arg_types()
    }

    #[must_use]
    pub fn slot_types(&self) -> Vec<SlotType> {
        self.0.slot_types()
    }

    pub(crate) fn invoke(&self, args: Vec<ArgValue>) -> Result<Vec<SlotValue>, ApiError> {
        self.0.invoke(args)
    }
}

impl std::fmt::Debug for BoxedHandlerFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxedHandlerFn").field(&self.type_name()).finish()
    }
}
