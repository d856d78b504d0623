//! Route tests driven through the router with `tower::ServiceExt::oneshot`.
