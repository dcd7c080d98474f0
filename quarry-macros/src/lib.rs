use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Field, Fields, LitStr, parse_macro_input};

#[proc_macro_derive(Model, attributes(quarry))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_model_impl(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

/// Options from `#[quarry(...)]` on a field.
#[derive(Default)]
struct FieldOptions {
    ignore: bool,
    default: bool,
    sensitive: bool,
    column: Option<String>,
}

fn struct_table_name(input: &DeriveInput) -> syn::Result<String> {
    let mut table = None;
    for attr in quarry_attrs(&input.attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                table = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported quarry attribute on struct, expected `table`"))
            }
        })?;
    }
    Ok(table.unwrap_or_else(|| input.ident.to_string().to_lowercase() + "s"))
}

fn field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in quarry_attrs(&field.attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("ignore") {
                options.ignore = true;
            } else if meta.path.is_ident("default") {
                options.default = true;
            } else if meta.path.is_ident("sensitive") {
                options.sensitive = true;
            } else if meta.path.is_ident("column") {
                let value: LitStr = meta.value()?.parse()?;
                options.column = Some(value.value());
            } else {
                return Err(meta.error(
                    "unsupported quarry attribute, expected one of `ignore`, `default`, `sensitive`, `column`",
                ));
            }
            Ok(())
        })?;
    }
    if options.ignore && (options.sensitive || options.column.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "an ignored field cannot also be `sensitive` or have a `column`",
        ));
    }
    Ok(options)
}

fn quarry_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("quarry"))
}

fn derive_model_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let table_name = struct_table_name(input)?;

    let all_fields = if let Data::Struct(data) = &input.data {
        if let Fields::Named(fields) = &data.fields {
            &fields.named
        } else {
            return Err(syn::Error::new_spanned(
                &data.fields,
                "Quarry Model only supports structs with named fields",
            ));
        }
    } else {
        return Err(syn::Error::new_spanned(
            input,
            "Quarry Model only supports structs",
        ));
    };

    let mut column_names = Vec::new();
    let mut sensitive_names = Vec::new();
    let mut initializers = Vec::new();

    for field in all_fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let options = field_options(field)?;

        if options.ignore {
            initializers.push(quote! { #ident: ::core::default::Default::default() });
            continue;
        }

        let column = options.column.unwrap_or_else(|| ident.to_string());
        if options.sensitive {
            sensitive_names.push(column.clone());
        }
        if options.default {
            initializers.push(quote! {
                #ident: row.get_opt::<#ty>(#column)?.unwrap_or_default()
            });
        } else {
            initializers.push(quote! {
                #ident: row.get::<#ty, _>(#column)?
            });
        }
        column_names.push(column);
    }

    let sensitive_impl = if sensitive_names.is_empty() {
        quote! {}
    } else {
        quote! {
            fn sensitive_fields() -> &'static [&'static str] {
                &[ #( #sensitive_names ),* ]
            }
        }
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics quarry_core::Model for #struct_name #ty_generics #where_clause {
            fn table_name() -> &'static str {
                #table_name
            }

            fn list_columns() -> &'static [&'static str] {
                &[ #( #column_names ),* ]
            }

            fn from_row(row: &quarry_core::Row) -> quarry_core::QuarryResult<Self> {
                Ok(Self {
                    #( #initializers, )*
                })
            }

            #sensitive_impl
        }
    })
}
