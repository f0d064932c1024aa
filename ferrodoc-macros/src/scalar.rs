use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse2, Data, DeriveInput, Fields};

/// Named scalars: single-field tuple structs and unit-only enums
pub fn derive_scalar(input: TokenStream) -> TokenStream {
    let input = match parse2::<DeriveInput>(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };
    let name = &input.ident;
    let name_str = name.unraw().to_string();

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(&input.generics, "Scalar cannot be derived for generic types")
            .to_compile_error();
    }

    let underlying = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                let inner = &unnamed.unnamed[0].ty;
                quote!(<#inner as ::ferrodoc_core::introspect::Describe>::field_type())
            }
            _ => {
                return syn::Error::new_spanned(
                    name,
                    "Scalar structs must have exactly one unnamed field",
                )
                .to_compile_error()
            }
        },
        Data::Enum(data) => {
            if let Some(variant) = data.variants.iter().find(|v| !matches!(v.fields, Fields::Unit)) {
                return syn::Error::new_spanned(
                    variant,
                    "Scalar enums can only have unit variants",
                )
                .to_compile_error();
            }
            quote!(::ferrodoc_core::introspect::FieldType::String)
        }
        Data::Union(_) => {
            return syn::Error::new_spanned(name, "Scalar cannot be derived for unions")
                .to_compile_error()
        }
    };

    quote! {
        impl ::ferrodoc_core::introspect::Describe for #name {
            fn field_type() -> ::ferrodoc_core::introspect::FieldType {
                ::ferrodoc_core::introspect::FieldType::Named {
                    name: #name_str,
                    underlying: ::std::boxed::Box::new(#underlying),
                }
            }
        }
    }
}
