mod edge_cases;
mod lost_and_found;
mod trade_flow;
