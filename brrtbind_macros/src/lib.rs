//! Derive macros that plug user types into the brrtbind descriptor protocol.
//!
//! - `#[derive(BodyArg)]` makes a deserializable type usable as a request body
//!   parameter (`T`, `Box<T>` and `Vec<T>`).
//! - `#[derive(JsonReturn)]` makes a serializable type a generic JSON return value
//!   (`T` and `Box<T>`).
//! - `#[derive(Marshaler)]` makes a `ResponseMarshaler` implementor a return value.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

#[proc_macro_derive(BodyArg)]
pub fn derive_body_arg(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::brrtbind::typed::Arg for #ident #ty_generics #where_clause {
            fn arg_type() -> ::brrtbind::typed::ArgType {
                ::brrtbind::typed::ArgType::body::<Self>()
            }
        }

        impl #impl_generics ::brrtbind::typed::Arg for ::std::boxed::Box<#ident #ty_generics> #where_clause {
            fn arg_type() -> ::brrtbind::typed::ArgType {
                ::brrtbind::typed::ArgType::boxed_body::<#ident #ty_generics>()
            }
        }

        impl #impl_generics ::brrtbind::typed::ArgElem for #ident #ty_generics #where_clause {
            fn seq_arg_type() -> ::brrtbind::typed::ArgType {
                ::brrtbind::typed::ArgType::body_seq::<Self>()
            }
        }
    };
    TokenStream::from(expanded)
}

#[proc_macro_derive(JsonReturn)]
pub fn derive_json_return(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let slot_impl = |ty: proc_macro2::TokenStream| {
        quote! {
            impl #impl_generics ::brrtbind::typed::ReturnSlot for #ty #where_clause {
                fn slot_type() -> ::brrtbind::typed::SlotType {
                    ::brrtbind::typed::SlotType::body::<Self>(
                        ::brrtbind::typed::RendererKind::Generic,
                    )
                }

                fn into_slot(self) -> ::brrtbind::typed::SlotValue {
                    ::brrtbind::typed::SlotValue::Body(
                        ::brrtbind::render::ResponseBody::Generic(
                            ::std::option::Option::Some(::std::boxed::Box::new(self)),
                        ),
                    )
                }
            }

            impl #impl_generics ::brrtbind::typed::Returns for #ty #where_clause {
                fn slot_types() -> ::std::vec::Vec<::brrtbind::typed::SlotType> {
                    ::std::vec![<Self as ::brrtbind::typed::ReturnSlot>::slot_type()]
                }

                fn into_slots(self) -> ::std::vec::Vec<::brrtbind::typed::SlotValue> {
                    ::std::vec![::brrtbind::typed::ReturnSlot::into_slot(self)]
                }
            }
        }
    };

    let plain = slot_impl(quote! { #ident #ty_generics });
    let boxed = slot_impl(quote! { ::std::boxed::Box<#ident #ty_generics> });
    TokenStream::from(quote! { #plain #boxed })
}

#[proc_macro_derive(Marshaler)]
pub fn derive_marshaler(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::brrtbind::typed::ReturnSlot for #ident #ty_generics #where_clause {
            fn slot_type() -> ::brrtbind::typed::SlotType {
                ::brrtbind::typed::SlotType::body::<Self>(
                    ::brrtbind::typed::RendererKind::Marshaler,
                )
            }

            fn into_slot(self) -> ::brrtbind::typed::SlotValue {
                ::brrtbind::typed::SlotValue::Body(
                    ::brrtbind::render::ResponseBody::Marshaler(
                        ::std::option::Option::Some(::std::boxed::Box::new(self)),
                    ),
                )
            }
        }

        impl #impl_generics ::brrtbind::typed::Returns for #ident #ty_generics #where_clause {
            fn slot_types() -> ::std::vec::Vec<::brrtbind::typed::SlotType> {
                ::std::vec![<Self as ::brrtbind::typed::ReturnSlot>::slot_type()]
            }

            fn into_slots(self) -> ::std::vec::Vec<::brrtbind::typed::SlotValue> {
                ::std::vec![::brrtbind::typed::ReturnSlot::into_slot(self)]
            }
        }
    };
    TokenStream::from(expanded)
}
