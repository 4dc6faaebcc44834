mod test_fault_profiles;
