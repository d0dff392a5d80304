//! Macro definitions for kernel module declarations.
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::{
    Ident, LitStr, Token, Type,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

struct ModuleArgs {
    ty: Option<Type>,
    name: Option<LitStr>,
    author: Option<LitStr>,
    description: Option<LitStr>,
    license: Option<LitStr>,
    version: Option<LitStr>,
}

fn set_once<T>(slot: &mut Option<T>, key: &Ident, value: T) -> syn::Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new(
            key.span(),
            format!("Duplicate field: {}", key),
        ));
    }
    *slot = Some(value);
    Ok(())
}

impl Parse for ModuleArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = ModuleArgs {
            ty: None,
            name: None,
            author: None,
            description: None,
            license: None,
            version: None,
        };
        while !input.is_empty() {
            // `type` is a keyword, so accept any identifier here.
            let key = Ident::parse_any(input)?;
            input.parse::<Token![:]>()?;

            match key.to_string().as_str() {
                "type" => set_once(&mut args.ty, &key, input.parse::<Type>()?)?,
                "name" => set_once(&mut args.name, &key, input.parse::<LitStr>()?)?,
                "author" => set_once(&mut args.author, &key, input.parse::<LitStr>()?)?,
                "description" => {
                    set_once(&mut args.description, &key, input.parse::<LitStr>()?)?
                }
                "license" => set_once(&mut args.license, &key, input.parse::<LitStr>()?)?,
                "version" => set_once(&mut args.version, &key, input.parse::<LitStr>()?)?,
                _ => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("Unknown field: {}", key),
                    ));
                }
            }

            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(args)
    }
}

fn required<T>(value: Option<T>, field: &str) -> syn::Result<T> {
    value.ok_or_else(|| {
        syn::Error::new(
            Span::call_site(),
            format!("Missing required field: {}", field),
        )
    })
}

/// One NUL-terminated `key=value` record for the `.modinfo` section.
fn modinfo_entry(key: &str, value: &LitStr) -> proc_macro2::TokenStream {
    let mut bytes = format!("{}=", key).into_bytes();
    bytes.extend_from_slice(value.value().as_bytes());
    bytes.push(0);
    let len = bytes.len();
    let ident = format_ident!("__MODINFO_{}", key.to_uppercase());
    quote! {
        #[used]
        #[unsafe(link_section = ".modinfo")]
        static #ident: [u8; #len] = [#(#bytes),*];
    }
}

fn expand(args: ModuleArgs) -> syn::Result<proc_macro2::TokenStream> {
    let ty = required(args.ty, "type")?;
    let name = required(args.name, "name")?;
    let license = required(args.license, "license")?;

    let mut modinfo = vec![modinfo_entry("name", &name), modinfo_entry("license", &license)];
    for (key, value) in [
        ("author", &args.author),
        ("description", &args.description),
        ("version", &args.version),
    ] {
        if let Some(value) = value {
            modinfo.push(modinfo_entry(key, value));
        }
    }

    Ok(quote! {
        #(#modinfo)*

        static __MODULE_SLOT: ::kmod::ModuleSlot<#ty> = ::kmod::ModuleSlot::new();

        fn __init_module(ctx: &::kmod::ModuleContext<'_>) -> ::kmod::LinuxResult<()> {
            __MODULE_SLOT.init(ctx)
        }

        fn __cleanup_module(chrdev: &dyn ::kmod::CharDevRegistry) {
            __MODULE_SLOT.exit(chrdev)
        }

        /// Handle the host uses to load, pin and unload this module.
        #[cfg_attr(target_os = "none", unsafe(link_section = ".gnu.linkonce.this_module"))]
        pub static THIS_MODULE: ::kmod::ThisModule =
            ::kmod::ThisModule::new(#name, Some(__init_module), Some(__cleanup_module));

        #[cfg(target_os = "none")]
        #[panic_handler]
        fn panic(_info: &core::panic::PanicInfo) -> ! {
            loop {}
        }
    })
}

/// Declare a module: its `kmod::KernelModule` type and the metadata placed in
/// the `.modinfo` section.
///
/// `type`, `name` and `license` are required; `author`, `description` and
/// `version` are optional.
///
/// # Example:
/// ```ignore
/// module! {
///     type: Hello,
///     name: "hello",
///     license: "GPL",
///     description: "A simple hello world kernel module",
///     version: "1.0.0",
/// }
/// ```
///
/// Parameters can be in any order.
#[proc_macro]
pub fn module(item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(item as ModuleArgs);
    expand(args)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
