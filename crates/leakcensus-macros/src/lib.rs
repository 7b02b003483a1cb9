use proc_macro::TokenStream;
use quote::{quote, quote_spanned};
use syn::parse::Parser;
use syn::{ItemFn, LitStr, parse_macro_input};

#[derive(Clone, Copy)]
enum Format {
    Text,
    Table,
    Json,
    JsonPretty,
}

impl Format {
    fn to_tokens(self) -> proc_macro2::TokenStream {
        match self {
            Format::Text => quote!(leakcensus::Format::Text),
            Format::Table => quote!(leakcensus::Format::Table),
            Format::Json => quote!(leakcensus::Format::Json),
            Format::JsonPretty => quote!(leakcensus::Format::JsonPretty),
        }
    }
}

/// Runs a leak census for the duration of the annotated function and reports
/// what is still live when it returns.
///
/// Apply it to `main` (or any other entry point). The census is named after
/// the function's path and reports once, also on early returns.
///
/// # Parameters
///
/// * `format` - `"text"` (default), `"table"`, `"json"` or `"json-pretty"`
///
/// # Examples
///
/// ```rust,ignore
/// #[leakcensus::main]
/// fn main() {
///     // Your code here
/// }
/// ```
///
/// ```rust,ignore
/// #[tokio::main]
/// #[leakcensus::main(format = "json-pretty")]
/// async fn main() {
///     // Your code here
/// }
/// ```
///
/// # Limitations
///
/// Only one census can be active at a time. Starting a second one (via this
/// macro or `LeakCensusBuilder`) panics.
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    let mut format = Format::Text;

    if !attr.is_empty() {
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("format") {
                meta.input.parse::<syn::Token![=]>()?;
                let lit: LitStr = meta.input.parse()?;
                format = match lit.value().as_str() {
                    "text" => Format::Text,
                    "table" => Format::Table,
                    "json" => Format::Json,
                    "json-pretty" => Format::JsonPretty,
                    other => {
                        return Err(meta.error(format!(
                            "Unknown format {:?}. Expected one of: \"text\", \"table\", \"json\", \"json-pretty\"",
                            other
                        )));
                    }
                };
                return Ok(());
            }

            Err(meta.error("Unknown parameter. Supported: format=\"..\""))
        });

        if let Err(e) = parser.parse2(proc_macro2::TokenStream::from(attr)) {
            return e.to_compile_error().into();
        }
    }

    let format_token = format.to_tokens();
    let fn_name = &sig.ident;

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            let _leakcensus = leakcensus::LeakCensusBuilder::new(
                concat!(module_path!(), "::", stringify!(#fn_name))
            )
            .format(#format_token)
            .build();

            #block
        }
    };

    output.into()
}

/// Attributes the heap allocations made by the annotated function to the
/// function's declaration site.
///
/// Allocations are recorded only while a census is active and the global hook
/// (`leakcensus-alloc` feature or a manually installed `LeakTracingAllocator`)
/// is in place. Nested tracked functions attribute to the innermost one.
/// `async fn`s are supported: the site follows the future across threads.
///
/// ```rust,ignore
/// #[leakcensus::track]
/// fn load_config() -> String {
///     std::fs::read_to_string("config.toml").unwrap_or_default()
/// }
/// ```
#[proc_macro_attribute]
pub fn track(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::TokenStream::from(attr).into_iter().next().map_or_else(
                proc_macro2::Span::call_site,
                |token| token.span(),
            ),
            "#[track] takes no parameters",
        )
        .to_compile_error()
        .into();
    }

    let input = parse_macro_input!(item as ItemFn);
    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    // file!()/line!() resolve at the function name
    let site = quote_spanned! {sig.ident.span()=>
        leakcensus::Site::new(file!(), line!())
    };

    let output = if sig.asyncness.is_some() {
        quote! {
            #(#attrs)*
            #vis #sig {
                leakcensus::TrackedFuture::new(#site, async #block).await
            }
        }
    } else {
        quote! {
            #(#attrs)*
            #vis #sig {
                let _leakcensus_scope = leakcensus::SiteScope::enter(#site);
                #block
            }
        }
    };

    output.into()
}
