use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, punctuated::Punctuated, token::Comma, Data, DeriveInput, Field, Fields,
    Ident,
};

/// Implements `ApiObject` (and `ListObject` when a `#[list_items]` field is present).
///
/// * `#[object_meta]` marks an `ObjectMeta` field, giving the object a name, a namespace and a self link
/// * `#[list_meta]` marks a `ListMeta` field, giving the list its own self link
/// * `#[list_items]` marks a `Vec<T>` field whose elements implement `ApiObject`
#[proc_macro_derive(ApiObject, attributes(object_meta, list_meta, list_items))]
pub fn derive_api_object(input: TokenStream) -> TokenStream {
    let parsed_input = parse_macro_input!(input as DeriveInput);
    let struct_ident = parsed_input.ident;
    let (impl_generics, type_generics, where_clause) = parsed_input.generics.split_for_impl();
    let parsed_struct = match parsed_input.data {
        Data::Struct(s) => s,
        _ => panic!("This derive macro is only applicable to named structs!"),
    };
    let fields = match parsed_struct.fields {
        Fields::Named(fields) => fields.named,
        _ => panic!("This derive macro is only applicable to named structs!"),
    };
    let object_meta_field = get_marked_field(&fields, "object_meta");
    let list_meta_field = get_marked_field(&fields, "list_meta");
    let list_items_field = get_marked_field(&fields, "list_items");

    if object_meta_field.is_some() && list_meta_field.is_some() {
        panic!("A struct can't carry both 'object_meta' and 'list_meta' attributes!");
    }

    let object_meta_impl = object_meta_field.map(|field| {
        quote! {
            fn object_meta(&self) -> ::std::option::Option<&::custom_metrics_apiserver_core::objects::ObjectMeta> {
                ::std::option::Option::Some(&self.#field)
            }
        }
    });

    let self_link_impl = object_meta_field.or(list_meta_field).map(|field| {
        quote! {
            fn self_link(&self) -> ::std::option::Option<&str> {
                self.#field.self_link.as_deref()
            }

            fn self_link_mut(&mut self) -> ::std::option::Option<&mut ::std::option::Option<::std::string::String>> {
                ::std::option::Option::Some(&mut self.#field.self_link)
            }
        }
    });

    let list_impl = list_items_field.map(|_| {
        quote! {
            fn is_list(&self) -> bool {
                true
            }

            fn as_list_mut(&mut self) -> ::std::option::Option<&mut dyn ::custom_metrics_apiserver_core::objects::ListObject> {
                ::std::option::Option::Some(self)
            }
        }
    });

    let list_object_impl = list_items_field.map(|field| {
        quote! {
            impl #impl_generics ::custom_metrics_apiserver_core::objects::ListObject for #struct_ident #type_generics #where_clause {
                fn item_count(&self) -> usize {
                    self.#field.len()
                }

                fn items_mut<'a>(
                    &'a mut self,
                ) -> ::std::boxed::Box<dyn ::std::iter::Iterator<Item = &'a mut dyn ::custom_metrics_apiserver_core::objects::ApiObject> + 'a> {
                    ::std::boxed::Box::new(
                        self.#field
                            .iter_mut()
                            .map(|item| item as &mut dyn ::custom_metrics_apiserver_core::objects::ApiObject),
                    )
                }
            }
        }
    });

    let output = quote! {
        impl #impl_generics ::custom_metrics_apiserver_core::objects::ApiObject for #struct_ident #type_generics #where_clause {
            #object_meta_impl
            #self_link_impl
            #list_impl
        }

        #list_object_impl
    };

    output.into()
}

fn get_marked_field<'a>(fields: &'a Punctuated<Field, Comma>, attribute: &str) -> Option<&'a Ident> {
    let mut marked = fields
        .iter()
        .filter(|f| f.attrs.iter().any(|a| a.meta.path().is_ident(attribute)));

    let field = marked.next()?;
    if marked.next().is_some() {
        panic!("Only one field can be marked with the '{attribute}' attribute!");
    }

    field.ident.as_ref()
}
