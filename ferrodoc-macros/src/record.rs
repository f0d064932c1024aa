use crate::serde_attr::{self, SerdeField};
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse2, Data, DeriveInput, Fields, LitStr, Visibility};

struct RecordField {
    ident: syn::Ident,
    ty: syn::Type,
    storage: String,
    rename: Option<String>,
    tag: String,
    public: bool,
    serde: SerdeField,
}

/// Join every `#[schema("...")]` on a field with commas
fn schema_tag(attrs: &[syn::Attribute]) -> syn::Result<String> {
    let mut parts = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("schema")) {
        let lit: LitStr = attr.parse_args()?;
        parts.push(lit.value());
    }
    Ok(parts.join(","))
}

fn collect_fields(input: &DeriveInput) -> syn::Result<Vec<RecordField>> {
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Record can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(&input.ident, "Record can only be derived for structs"))
        }
    };

    let rename_all = serde_attr::parse_rename_all(&input.attrs)?;
    let mut fields = Vec::with_capacity(named.len());

    for field in named {
        let Some(ident) = field.ident.clone() else { continue };
        let name = ident.unraw().to_string();
        let serde = serde_attr::parse_field(&field.attrs)?;

        let rename = match (&serde.rename, &rename_all) {
            (Some(explicit), _) => Some(explicit.clone()),
            (None, Some(rule)) => {
                let renamed = serde_attr::apply_rename_all(rule, &name)?;
                (renamed != name).then_some(renamed)
            }
            (None, None) => None,
        };

        fields.push(RecordField {
            storage: rename.clone().unwrap_or_else(|| name.clone()),
            rename,
            tag: schema_tag(&field.attrs)?,
            public: matches!(field.vis, Visibility::Public(_)),
            ty: field.ty.clone(),
            ident,
            serde,
        });
    }

    let mut seen = std::collections::HashSet::new();
    for field in fields.iter().filter(|f| !f.serde.skipped && !f.serde.flatten) {
        if !seen.insert(field.storage.as_str()) {
            return Err(syn::Error::new_spanned(
                &field.ident,
                format!("duplicate storage name '{}'", field.storage),
            ));
        }
    }

    Ok(fields)
}

pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = match parse2::<DeriveInput>(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(&input.generics, "Record cannot be derived for generic structs")
            .to_compile_error();
    }

    match collect_fields(&input) {
        Ok(fields) => expand(&input.ident, &fields),
        Err(err) => err.to_compile_error(),
    }
}

fn expand(name: &syn::Ident, fields: &[RecordField]) -> TokenStream {
    let name_str = name.unraw().to_string();
    let introspect = quote!(::ferrodoc_core::introspect);
    let inspect = quote!(::ferrodoc_core::model_inspect);
    let private = quote!(::ferrodoc_core::__private);

    let descriptors = fields.iter().map(|f| {
        let ident = f.ident.unraw().to_string();
        let rename = match &f.rename {
            Some(r) => quote!(::core::option::Option::Some(#r)),
            None => quote!(::core::option::Option::None),
        };
        let tag = &f.tag;
        let public = f.public;
        let skipped = f.serde.skipped;
        let flatten = f.serde.flatten;
        // Skipped fields are never stored, so their type need not be describable
        let ty = if skipped {
            quote!(#introspect::FieldType::Any)
        } else {
            let field_ty = &f.ty;
            quote!(<#field_ty as #introspect::Describe>::field_type())
        };
        quote! {
            #introspect::FieldDescriptor {
                ident: #ident,
                rename: #rename,
                tag: #tag,
                public: #public,
                skipped: #skipped,
                flatten: #flatten,
                ty: #ty,
            }
        }
    });

    // Declaration order: the first member to claim a storage name wins
    let readable: Vec<&RecordField> = fields.iter().filter(|f| !f.serde.skipped).collect();

    let get_steps = readable.iter().map(|f| {
        let ident = &f.ident;
        if f.serde.flatten {
            quote! {
                if let ::core::option::Option::Some(value) =
                    #inspect::Inspectable::try_field_value(&self.#ident, field_name)?
                {
                    return ::core::result::Result::Ok(::core::option::Option::Some(value));
                }
            }
        } else {
            let storage = &f.storage;
            quote! {
                if field_name == #storage {
                    return #private::bson::to_bson(&self.#ident)
                        .map(::core::option::Option::Some)
                        .map_err(|e| ::std::string::ToString::to_string(&e));
                }
            }
        }
    });

    let set_steps = readable.iter().map(|f| {
        let ident = &f.ident;
        if f.serde.flatten {
            quote! {
                if #inspect::Inspectable::has_field(&self.#ident, field_name) {
                    return #inspect::FieldAccess::set_field_value(&mut self.#ident, field_name, value);
                }
            }
        } else {
            let storage = &f.storage;
            quote! {
                if field_name == #storage {
                    self.#ident = #private::bson::from_bson(value).map_err(|e| {
                        #private::anyhow::Error::msg(::std::format!(
                            "cannot set field '{}' on {}: {}", field_name, #name_str, e
                        ))
                    })?;
                    return ::core::result::Result::Ok(());
                }
            }
        }
    });

    quote! {
        impl #introspect::Describe for #name {
            fn field_type() -> #introspect::FieldType {
                #introspect::FieldType::Record(#introspect::RecordRef::new(
                    #name_str,
                    <#name as #inspect::Record>::descriptor,
                ))
            }
        }

        impl #inspect::Record for #name {
            fn descriptor() -> #introspect::RecordDescriptor {
                #introspect::RecordDescriptor {
                    name: #name_str,
                    fields: ::std::vec![#(#descriptors),*],
                }
            }
        }

        impl #inspect::Inspectable for #name {
            fn get_field_value(&self, field_name: &str) -> ::core::option::Option<#private::bson::Bson> {
                #inspect::Inspectable::try_field_value(self, field_name).ok().flatten()
            }

            fn try_field_value(
                &self,
                field_name: &str,
            ) -> ::core::result::Result<
                ::core::option::Option<#private::bson::Bson>,
                ::std::string::String,
            > {
                #(#get_steps)*
                ::core::result::Result::Ok(::core::option::Option::None)
            }
        }

        impl #inspect::FieldAccess for #name {
            fn set_field_value(
                &mut self,
                field_name: &str,
                value: #private::bson::Bson,
            ) -> #private::anyhow::Result<()> {
                #(#set_steps)*
                ::core::result::Result::Err(#private::anyhow::Error::msg(::std::format!(
                    "{} has no field '{}'", #name_str, field_name
                )))
            }
        }
    }
}
