pub mod lib_http;
